//! AI-backed account classification over a whole batch in one call,
//! with per-row enhancement by the local classifier and a full local
//! degraded mode on service failure.

use log::{debug, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::fallback::LocalClassifier;
use crate::llm::{parse_json_response, prompts, CompletionRequest, CompletionService};
use crate::schema::{AccountClassification, DocumentStructure, StatementType};
use crate::table::{extract_accounts, ExtractedAccount, RawTable};
use crate::taxonomy::CategoryCatalog;

/// AI results below this confidence are re-scored locally.
const ENHANCE_THRESHOLD: u8 = 50;

#[derive(Debug, Clone, Default)]
pub struct ClassificationContext {
    pub statement_type: StatementType,
    pub currency: Option<String>,
}

/// Response shape of the combined single-call variant: structure and
/// classifications from one prompt, halving external calls.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CombinedAnalysis {
    pub structure: DocumentStructure,
    pub classifications: Vec<AccountClassification>,
}

pub struct AccountClassifier<'a, S> {
    service: &'a S,
    catalog: &'a CategoryCatalog,
}

impl<'a, S: CompletionService> AccountClassifier<'a, S> {
    pub fn new(service: &'a S, catalog: &'a CategoryCatalog) -> Self {
        Self { service, catalog }
    }

    /// Classifies the whole batch with a single completion call. Never
    /// fails: a dead or garbled service degrades every account to the
    /// local classifier.
    pub async fn classify(
        &self,
        accounts: &[ExtractedAccount],
        context: &ClassificationContext,
    ) -> Vec<AccountClassification> {
        if accounts.is_empty() {
            return Vec::new();
        }

        let request = CompletionRequest::new(
            prompts::CLASSIFY_SYSTEM,
            prompts::classification_prompt(accounts, context),
        )
        .with_schema(
            serde_json::to_value(schemars::schema_for!(Vec<AccountClassification>)).ok(),
        );

        match self.service.complete(&request).await {
            Ok(raw) => match parse_json_response::<Vec<AccountClassification>>(&raw) {
                Ok(parsed) => self.reconcile(accounts, parsed, context),
                Err(failure) => {
                    warn!(
                        "classification response rejected ({}); degrading whole batch to local classifier",
                        failure
                    );
                    self.classify_locally(accounts, context)
                }
            },
            Err(failure) => {
                warn!(
                    "classification call failed ({}); degrading whole batch to local classifier",
                    failure
                );
                self.classify_locally(accounts, context)
            }
        }
    }

    /// Combined single-call variant: structure analysis and
    /// classification from one prompt. Returns `None` on any failure so
    /// the caller can run the separate-call sequence instead.
    pub async fn classify_combined(
        &self,
        table: &RawTable,
        file_name_hint: Option<&str>,
        sample_rows: usize,
    ) -> Option<(DocumentStructure, Vec<AccountClassification>)> {
        if table.row_count() == 0 {
            return None;
        }

        let sample = table.sample_text(sample_rows.max(1));
        let request = CompletionRequest::new(
            prompts::COMBINED_SYSTEM,
            prompts::combined_prompt(&sample, file_name_hint),
        )
        .with_schema(serde_json::to_value(schemars::schema_for!(CombinedAnalysis)).ok());

        let raw = match self.service.complete(&request).await {
            Ok(raw) => raw,
            Err(failure) => {
                warn!("combined analysis call failed ({})", failure);
                return None;
            }
        };
        let mut combined: CombinedAnalysis = match parse_json_response(&raw) {
            Ok(combined) => combined,
            Err(failure) => {
                warn!("combined analysis response rejected ({})", failure);
                return None;
            }
        };

        combined
            .structure
            .sanitize(table.row_count(), table.column_count());

        let accounts = extract_accounts(table, &combined.structure);
        let context = ClassificationContext {
            statement_type: combined.structure.statement_type,
            currency: Some(combined.structure.currency.clone()),
        };
        let results = self.reconcile(&accounts, combined.classifications, &context);
        Some((combined.structure, results))
    }

    /// Fully local degraded mode, also used account-by-account when the
    /// AI skipped an entry.
    pub fn classify_locally(
        &self,
        accounts: &[ExtractedAccount],
        context: &ClassificationContext,
    ) -> Vec<AccountClassification> {
        let local = LocalClassifier::new(self.catalog);
        accounts
            .iter()
            .map(|account| {
                local
                    .classify(&account.name, account.value, Some(context.statement_type))
                    .into_classification(account)
            })
            .collect()
    }

    /// Aligns AI output with the extracted accounts (one result per
    /// account, in row order) and runs the enhancement pass over each.
    fn reconcile(
        &self,
        accounts: &[ExtractedAccount],
        parsed: Vec<AccountClassification>,
        context: &ClassificationContext,
    ) -> Vec<AccountClassification> {
        let local = LocalClassifier::new(self.catalog);
        let positional = parsed.len() == accounts.len();

        accounts
            .iter()
            .enumerate()
            .map(|(position, account)| {
                let ai_row = if positional {
                    Some(&parsed[position])
                } else {
                    parsed
                        .iter()
                        .find(|r| r.account_name.eq_ignore_ascii_case(&account.name))
                };

                let mut row = match ai_row {
                    Some(ai_row) => {
                        let mut row = ai_row.clone();
                        row.account_name = account.name.clone();
                        row.row_index = account.row_index;
                        row.amount = account.value;
                        row
                    }
                    None => {
                        debug!("AI skipped '{}'; classifying locally", account.name);
                        local
                            .classify(&account.name, account.value, Some(context.statement_type))
                            .into_classification(account)
                    }
                };
                self.enhance(&mut row, account, context);
                row
            })
            .collect()
    }

    /// Re-scores weak AI rows with the local classifier; the more
    /// specific or higher-confidence result wins.
    fn enhance(
        &self,
        row: &mut AccountClassification,
        account: &ExtractedAccount,
        context: &ClassificationContext,
    ) {
        let unknown = row.suggested_category.is_empty()
            || !self.catalog.contains(&row.suggested_category);
        let generic = is_generic_key(&row.suggested_category);
        if !unknown && !generic && row.confidence >= ENHANCE_THRESHOLD {
            return;
        }

        let local = LocalClassifier::new(self.catalog).classify(
            &account.name,
            account.value,
            Some(context.statement_type),
        );
        let local_is_better = local.confidence > row.confidence
            || ((unknown || generic) && !is_generic_key(&local.category));
        if !local_is_better {
            return;
        }

        row.suggested_category = local.category;
        row.is_inflow = local.is_inflow;
        row.confidence = row.confidence.max(local.confidence);
        row.reasoning = format!("{} (enhanced by local classifier)", local.reasoning);
    }
}

fn is_generic_key(key: &str) -> bool {
    key.starts_with("other_") || key == "miscellaneous" || key == "uncategorized"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{AiFailure, AiOutcome};

    struct StubService {
        response: AiOutcome,
    }

    impl CompletionService for StubService {
        async fn complete(&self, _request: &CompletionRequest) -> AiOutcome {
            self.response.clone()
        }
    }

    fn accounts() -> Vec<ExtractedAccount> {
        vec![
            ExtractedAccount {
                name: "Sales".to_string(),
                row_index: 1,
                value: Some(100_000.0),
            },
            ExtractedAccount {
                name: "Office Rent".to_string(),
                row_index: 2,
                value: Some(-12_000.0),
            },
        ]
    }

    fn context() -> ClassificationContext {
        ClassificationContext {
            statement_type: StatementType::ProfitLoss,
            currency: Some("USD".to_string()),
        }
    }

    #[tokio::test]
    async fn test_service_failure_degrades_whole_batch() {
        let service = StubService {
            response: Err(AiFailure::Service("503".into())),
        };
        let classifier = AccountClassifier::new(&service, CategoryCatalog::builtin());
        let results = classifier.classify(&accounts(), &context()).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].suggested_category, "sales_revenue");
        assert_eq!(results[1].suggested_category, "rent_expense");
        assert_eq!(results[0].row_index, 1);
    }

    #[tokio::test]
    async fn test_weak_ai_rows_are_enhanced_locally() {
        let service = StubService {
            response: Ok(r#"[
                {"accountName":"Sales","suggestedCategory":"sales_revenue","isInflow":true,"confidence":92,"reasoning":"clear"},
                {"accountName":"Office Rent","suggestedCategory":"other_expense","isInflow":false,"confidence":40,"reasoning":"unclear"}
            ]"#
            .into()),
        };
        let classifier = AccountClassifier::new(&service, CategoryCatalog::builtin());
        let results = classifier.classify(&accounts(), &context()).await;

        assert_eq!(results[0].suggested_category, "sales_revenue");
        assert_eq!(results[0].confidence, 92);

        assert_eq!(results[1].suggested_category, "rent_expense");
        assert!(results[1].reasoning.contains("(enhanced by local classifier)"));
    }

    #[tokio::test]
    async fn test_unknown_category_is_replaced() {
        let service = StubService {
            response: Ok(r#"[
                {"accountName":"Sales","suggestedCategory":"made_up_key","isInflow":true,"confidence":95},
                {"accountName":"Office Rent","suggestedCategory":"rent_expense","isInflow":false,"confidence":88}
            ]"#
            .into()),
        };
        let classifier = AccountClassifier::new(&service, CategoryCatalog::builtin());
        let results = classifier.classify(&accounts(), &context()).await;

        assert_eq!(results[0].suggested_category, "sales_revenue");
        assert_eq!(results[1].suggested_category, "rent_expense");
        assert!(!results[1].reasoning.contains("enhanced"));
    }

    #[tokio::test]
    async fn test_missing_entries_are_filled_locally() {
        // AI returned fewer rows than accounts; match falls back to
        // name lookup and the missing account is classified locally.
        let service = StubService {
            response: Ok(r#"[
                {"accountName":"sales","suggestedCategory":"sales_revenue","isInflow":true,"confidence":90}
            ]"#
            .into()),
        };
        let classifier = AccountClassifier::new(&service, CategoryCatalog::builtin());
        let results = classifier.classify(&accounts(), &context()).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].suggested_category, "sales_revenue");
        assert_eq!(results[1].suggested_category, "rent_expense");
    }

    #[tokio::test]
    async fn test_combined_variant_happy_path() {
        let table = RawTable::new(vec![
            vec![
                crate::table::Cell::Text("Account".into()),
                crate::table::Cell::Text("2024".into()),
            ],
            vec![
                crate::table::Cell::Text("Sales".into()),
                crate::table::Cell::Number(100.0),
            ],
        ]);
        let service = StubService {
            response: Ok(r#"{
                "structure": {
                    "statementType": "profit_loss",
                    "confidence": 85,
                    "headerRows": [0],
                    "dataStartRow": 1,
                    "dataEndRow": 1,
                    "accountColumns": {"nameColumn": 0, "confidence": 90},
                    "periodColumns": [{"columnIndex": 1, "periodLabel": "2024", "periodType": "year", "confidence": 90}],
                    "currency": "USD"
                },
                "classifications": [
                    {"accountName":"Sales","rowIndex":1,"suggestedCategory":"sales_revenue","isInflow":true,"confidence":93}
                ]
            }"#
            .into()),
        };
        let classifier = AccountClassifier::new(&service, CategoryCatalog::builtin());
        let (structure, results) = classifier
            .classify_combined(&table, None, 25)
            .await
            .expect("combined analysis");

        assert_eq!(structure.statement_type, StatementType::ProfitLoss);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].suggested_category, "sales_revenue");
        assert_eq!(results[0].amount, Some(100.0));
    }

    #[tokio::test]
    async fn test_combined_variant_failure_returns_none() {
        let table = RawTable::new(vec![vec![crate::table::Cell::Text("Sales".into())]]);
        let service = StubService {
            response: Ok("not json at all".into()),
        };
        let classifier = AccountClassifier::new(&service, CategoryCatalog::builtin());
        assert!(classifier.classify_combined(&table, None, 25).await.is_none());
    }
}
