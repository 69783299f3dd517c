//! Top-level orchestration: structure analysis → account extraction →
//! classification → validation. Stateless across invocations; at most
//! two completion calls per document, one in combined mode, zero in the
//! offline path.

use log::{info, warn};

use crate::fallback::LocalClassifier;
use crate::llm::analyzer::{fallback_structure, StructureAnalyzer, MAX_SAMPLE_ROWS};
use crate::llm::classifier::{AccountClassifier, ClassificationContext};
use crate::llm::CompletionService;
use crate::schema::{AccountClassification, DocumentStructure, ValidationResult};
use crate::table::{extract_accounts, RawTable};
use crate::taxonomy::CategoryCatalog;
use crate::validation::{ValidationConfig, ValidationContext, ValidationEngine};

/// Behavior switches for the pipeline. `combined_analysis` folds the
/// structure and classification calls into one prompt; the two-call
/// sequence remains the fallback for it, never a parallel code path.
#[derive(Debug, Clone)]
pub struct ClassifierOptions {
    pub combined_analysis: bool,
    pub sample_rows: usize,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            combined_analysis: false,
            sample_rows: MAX_SAMPLE_ROWS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub structure: DocumentStructure,
    pub results: Vec<AccountClassification>,
    pub validation: ValidationResult,
}

pub struct StatementPipeline<'a, S> {
    service: &'a S,
    catalog: &'a CategoryCatalog,
    options: ClassifierOptions,
    validation: ValidationConfig,
}

impl<'a, S: CompletionService> StatementPipeline<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self {
            service,
            catalog: CategoryCatalog::builtin(),
            options: ClassifierOptions::default(),
            validation: ValidationConfig::default(),
        }
    }

    /// Swap in a merged catalog carrying a tenant's custom categories.
    pub fn with_catalog(mut self, catalog: &'a CategoryCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_options(mut self, options: ClassifierOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_validation_config(mut self, config: ValidationConfig) -> Self {
        self.validation = config;
        self
    }

    /// Runs the full pipeline over one table. Always returns a complete
    /// classification set; quality is communicated through confidences
    /// and `requires_manual_review`, never through failure.
    pub async fn process(
        &self,
        table: &RawTable,
        file_name_hint: Option<&str>,
    ) -> PipelineOutput {
        info!(
            "processing table: {} rows x {} columns",
            table.row_count(),
            table.column_count()
        );

        if self.options.combined_analysis {
            let classifier = AccountClassifier::new(self.service, self.catalog);
            if let Some((structure, results)) = classifier
                .classify_combined(table, file_name_hint, self.options.sample_rows)
                .await
            {
                return self.finish(structure, results);
            }
            warn!("combined analysis unavailable; running separate calls");
        }

        let structure = StructureAnalyzer::new(self.service)
            .with_sample_rows(self.options.sample_rows)
            .analyze(table, file_name_hint)
            .await;

        let accounts = extract_accounts(table, &structure);
        let context = ClassificationContext {
            statement_type: structure.statement_type,
            currency: Some(structure.currency.clone()),
        };
        let results = AccountClassifier::new(self.service, self.catalog)
            .classify(&accounts, &context)
            .await;

        self.finish(structure, results)
    }

    fn finish(
        &self,
        structure: DocumentStructure,
        results: Vec<AccountClassification>,
    ) -> PipelineOutput {
        let engine = ValidationEngine::with_config(self.catalog, self.validation.clone());
        let context = ValidationContext {
            document_type: Some(structure.statement_type),
            language: None,
        };
        let batch = engine.validate(results, &context);
        PipelineOutput {
            structure,
            results: batch.results,
            validation: batch.validation,
        }
    }
}

/// The fully local path: fallback structure, local classifier,
/// validation. Zero external calls; this is the same degraded mode the
/// AI path lands in on failure, exposed for callers without a service.
pub fn process_offline(table: &RawTable, file_name_hint: Option<&str>) -> PipelineOutput {
    let catalog = CategoryCatalog::builtin();
    let structure = fallback_structure(table, file_name_hint);
    let accounts = extract_accounts(table, &structure);

    let local = LocalClassifier::new(catalog);
    let results: Vec<AccountClassification> = accounts
        .iter()
        .map(|account| {
            local
                .classify(&account.name, account.value, Some(structure.statement_type))
                .into_classification(account)
        })
        .collect();

    let engine = ValidationEngine::new(catalog);
    let context = ValidationContext {
        document_type: Some(structure.statement_type),
        language: None,
    };
    let batch = engine.validate(results, &context);
    PipelineOutput {
        structure,
        results: batch.results,
        validation: batch.validation,
    }
}
