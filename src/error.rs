use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Invalid category key '{0}': keys must match [a-z][a-z0-9_]*")]
    InvalidCategoryKey(String),

    #[error("Duplicate custom category '{key}' for company {company_id}")]
    DuplicateCustomCategory { key: String, company_id: String },

    #[error("Custom category '{0}' collides with a built-in category")]
    BuiltinCategoryCollision(String),

    #[error("Custom category '{key}' is missing a label for locale {locale}")]
    MissingCategoryLabel { key: String, locale: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClassifierError>;
