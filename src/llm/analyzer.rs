//! AI-backed document structure analysis with a deterministic fallback
//! that guarantees the pipeline never stalls on a bad or missing
//! completion.

use log::{debug, warn};

use crate::llm::{parse_json_response, prompts, CompletionRequest, CompletionService};
use crate::schema::{DocumentStructure, StatementType};
use crate::table::RawTable;

/// Rows submitted to the completion service; deeper tables are
/// extrapolated from this sample (token/latency bound).
pub const MAX_SAMPLE_ROWS: usize = 25;

const FALLBACK_CONFIDENCE: u8 = 30;

pub struct StructureAnalyzer<'a, S> {
    service: &'a S,
    sample_rows: usize,
}

impl<'a, S: CompletionService> StructureAnalyzer<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self {
            service,
            sample_rows: MAX_SAMPLE_ROWS,
        }
    }

    pub fn with_sample_rows(mut self, sample_rows: usize) -> Self {
        self.sample_rows = sample_rows.max(1);
        self
    }

    /// Determines the table layout. Never fails: service errors and
    /// unparseable responses both degrade to [`fallback_structure`].
    pub async fn analyze(
        &self,
        table: &RawTable,
        file_name_hint: Option<&str>,
    ) -> DocumentStructure {
        if table.row_count() == 0 {
            return fallback_structure(table, file_name_hint);
        }

        let sample = table.sample_text(self.sample_rows);
        let request = CompletionRequest::new(
            prompts::STRUCTURE_SYSTEM,
            prompts::structure_prompt(&sample, file_name_hint),
        )
        .with_schema(serde_json::to_value(schemars::schema_for!(DocumentStructure)).ok());

        match self.service.complete(&request).await {
            Ok(raw) => match parse_json_response::<DocumentStructure>(&raw) {
                Ok(mut structure) => {
                    structure.sanitize(table.row_count(), table.column_count());
                    debug!(
                        "structure analysis: {:?} at confidence {}",
                        structure.statement_type, structure.confidence
                    );
                    structure
                }
                Err(failure) => {
                    warn!("structure response rejected ({}); using fallback", failure);
                    fallback_structure(table, file_name_hint)
                }
            },
            Err(failure) => {
                warn!("structure analysis failed ({}); using fallback", failure);
                fallback_structure(table, file_name_hint)
            }
        }
    }
}

/// Minimal deterministic structure used whenever the completion service
/// is unavailable or returns garbage: header on row 0, everything else
/// data, USD, no period columns.
pub fn fallback_structure(table: &RawTable, file_name_hint: Option<&str>) -> DocumentStructure {
    let rows = table.row_count();
    let mut structure = DocumentStructure {
        statement_type: hint_statement_type(file_name_hint),
        confidence: FALLBACK_CONFIDENCE,
        reasoning: "Deterministic fallback: structure analysis was unavailable, assuming a \
                    header row followed by data rows"
            .to_string(),
        ..DocumentStructure::default()
    };
    if rows > 0 {
        structure.header_rows = vec![0];
        structure.data_start_row = if rows > 1 { 1 } else { 0 };
        structure.data_end_row = rows - 1;
    }
    structure
}

/// Best-effort statement type from the uploaded file's name.
pub(crate) fn hint_statement_type(file_name_hint: Option<&str>) -> StatementType {
    let hint = match file_name_hint {
        Some(h) => h.to_lowercase(),
        None => return StatementType::Unknown,
    };
    if hint.contains("balance") || hint.contains("situacion") || hint.contains("situación") {
        StatementType::BalanceSheet
    } else if hint.contains("cash") || hint.contains("flujo") || hint.contains("efectivo") {
        StatementType::CashFlow
    } else if hint.contains("profit")
        || hint.contains("income")
        || hint.contains("p&l")
        || hint.contains("resultados")
    {
        StatementType::ProfitLoss
    } else {
        StatementType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{AiFailure, AiOutcome};
    use crate::table::Cell;

    struct StubService {
        response: AiOutcome,
    }

    impl CompletionService for StubService {
        async fn complete(&self, _request: &CompletionRequest) -> AiOutcome {
            self.response.clone()
        }
    }

    fn table() -> RawTable {
        RawTable::new(vec![
            vec![Cell::Text("Account".into()), Cell::Text("2024".into())],
            vec![Cell::Text("Sales".into()), Cell::Number(100.0)],
            vec![Cell::Text("Rent".into()), Cell::Number(-20.0)],
        ])
    }

    #[tokio::test]
    async fn test_service_failure_degrades_to_fallback() {
        let service = StubService {
            response: Err(AiFailure::Service("timeout".into())),
        };
        let structure = StructureAnalyzer::new(&service).analyze(&table(), None).await;
        assert_eq!(structure.confidence, 30);
        assert_eq!(structure.statement_type, StatementType::Unknown);
        assert_eq!(structure.header_rows, vec![0]);
        assert_eq!(structure.data_start_row, 1);
        assert_eq!(structure.data_end_row, 2);
        assert_eq!(structure.currency, "USD");
        assert!(structure.period_columns.is_empty());
    }

    #[tokio::test]
    async fn test_garbage_response_degrades_to_fallback() {
        let service = StubService {
            response: Ok("I can't help with that.".into()),
        };
        let structure = StructureAnalyzer::new(&service).analyze(&table(), None).await;
        assert_eq!(structure.confidence, 30);
    }

    #[tokio::test]
    async fn test_valid_response_is_sanitized() {
        let service = StubService {
            response: Ok(r#"{
                "statementType": "profit_loss",
                "confidence": 150,
                "headerRows": [0],
                "dataStartRow": 1,
                "dataEndRow": 500,
                "periodColumns": [
                    {"columnIndex": 1, "periodLabel": "2024", "periodType": "year", "confidence": 90},
                    {"columnIndex": 7, "periodLabel": "ghost", "periodType": "year", "confidence": 90}
                ],
                "currency": "eur"
            }"#
            .into()),
        };
        let structure = StructureAnalyzer::new(&service).analyze(&table(), None).await;
        assert_eq!(structure.statement_type, StatementType::ProfitLoss);
        assert_eq!(structure.confidence, 100);
        assert_eq!(structure.data_end_row, 2);
        assert_eq!(structure.period_columns.len(), 1);
        assert_eq!(structure.currency, "EUR");
    }

    #[tokio::test]
    async fn test_filename_hint_reaches_the_fallback() {
        let service = StubService {
            response: Err(AiFailure::Service("down".into())),
        };
        let structure = StructureAnalyzer::new(&service)
            .analyze(&table(), Some("balance_general_2024.xlsx"))
            .await;
        assert_eq!(structure.statement_type, StatementType::BalanceSheet);
    }

    #[test]
    fn test_fallback_on_single_row_table() {
        let table = RawTable::new(vec![vec![Cell::Text("Sales".into())]]);
        let structure = fallback_structure(&table, None);
        assert_eq!(structure.data_start_row, 0);
        assert_eq!(structure.data_end_row, 0);
    }
}
