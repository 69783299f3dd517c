//! # Statement Classifier
//!
//! Financial statement understanding for uploaded spreadsheets:
//! structural analysis of an arbitrary tabular layout, per-line-item
//! account classification, and a deterministic validation/correction
//! layer that reconciles the probabilistic classifier with accounting
//! rules.
//!
//! ## Core Concepts
//!
//! - **Raw table**: a 2-D array of cells produced by an upstream file
//!   parser; the only input the pipeline needs.
//! - **Document structure**: statement type, header/data row ranges,
//!   account and period columns, currency. AI-detected with a
//!   deterministic fallback.
//! - **Classification**: category key + inflow/outflow polarity +
//!   bounded confidence per line item, AI-first with a local
//!   keyword classifier behind it.
//! - **Validation**: pure rule engine that corrects total/header flags,
//!   sharpens generic categories, enforces polarity, checks hierarchy
//!   sums, and decides whether the batch needs a human.
//!
//! The completion service is treated as an opaque, possibly-failing
//! text generator: every failure path degrades to a fully local result,
//! and the pipeline always returns a complete classification set.
//!
//! ## Example
//!
//! ```rust,ignore
//! use statement_classifier::*;
//!
//! let service = GeminiClient::new(std::env::var("GEMINI_API_KEY")?);
//! let table = RawTable::new(cells);
//!
//! let pipeline = StatementPipeline::new(&service);
//! let output = pipeline.process(&table, Some("p&l_2024.xlsx")).await;
//!
//! for row in &output.results {
//!     println!("{} -> {} ({}%)", row.account_name, row.suggested_category, row.confidence);
//! }
//! if output.validation.requires_manual_review {
//!     println!("batch flagged for review");
//! }
//! ```

pub mod error;
pub mod fallback;
mod keywords;
pub mod llm;
pub mod mapper;
pub mod pipeline;
pub mod schema;
pub mod table;
pub mod taxonomy;
pub mod validation;

pub use error::{ClassifierError, Result};
pub use fallback::{LocalClassification, LocalClassifier, MatchMethod};
pub use llm::analyzer::{fallback_structure, StructureAnalyzer, MAX_SAMPLE_ROWS};
pub use llm::classifier::{AccountClassifier, ClassificationContext, CombinedAnalysis};
pub use llm::{AiFailure, AiOutcome, CompletionRequest, CompletionService};
pub use mapper::{suggest, ConfidenceBand, Suggestion};
pub use pipeline::{process_offline, ClassifierOptions, PipelineOutput, StatementPipeline};
pub use schema::{
    AccountClassification, AccountColumns, AlternativeCategory, Correction, CorrectionField,
    DocumentStructure, PeriodColumn, PeriodType, Severity, StatementType, ValidationResult,
    Warning,
};
pub use table::{extract_accounts, Cell, ExtractedAccount, RawTable};
pub use taxonomy::{
    validate_custom, validate_key, CategoryCatalog, CategoryDefinition, CategoryGroup,
    CategoryKind, CustomCategory, Locale,
};
pub use validation::{
    ValidatedBatch, ValidationConfig, ValidationContext, ValidationEngine,
};

#[cfg(feature = "gemini")]
pub use llm::gemini::GeminiClient;
