use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// The kind of financial document being analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatementType {
    #[schemars(description = "Profit and loss / income statement: revenue and expense flows over a period")]
    ProfitLoss,

    #[schemars(description = "Balance sheet: assets, liabilities and equity at a point in time")]
    BalanceSheet,

    #[schemars(description = "Cash flow statement: receipts and payments grouped by activity")]
    CashFlow,

    #[default]
    #[serde(other)]
    #[schemars(description = "Statement type could not be determined")]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    Month,
    Quarter,
    Year,
    #[default]
    #[serde(other)]
    Custom,
}

/// A column holding monetary values for one reporting period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PeriodColumn {
    #[schemars(description = "Zero-based column index in the source table")]
    pub column_index: usize,

    #[schemars(description = "The period label as written in the header, e.g. 'Jan 2024' or 'FY2023'")]
    pub period_label: String,

    #[schemars(description = "Granularity of the period")]
    pub period_type: PeriodType,

    #[serde(deserialize_with = "deserialize_confidence")]
    #[schemars(description = "Detection confidence, 0-100")]
    pub confidence: u8,
}

impl Default for PeriodColumn {
    fn default() -> Self {
        Self {
            column_index: 0,
            period_label: String::new(),
            period_type: PeriodType::Custom,
            confidence: 0,
        }
    }
}

/// Where account codes and names live in the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountColumns {
    #[schemars(description = "Column index of numeric account codes, if any")]
    pub code_column: Option<usize>,

    #[schemars(description = "Column index of account names")]
    pub name_column: Option<usize>,

    #[serde(deserialize_with = "deserialize_confidence")]
    #[schemars(description = "Detection confidence, 0-100")]
    pub confidence: u8,
}

impl Default for AccountColumns {
    fn default() -> Self {
        Self {
            code_column: None,
            name_column: None,
            confidence: 0,
        }
    }
}

/// Structural description of one uploaded statement table. Immutable
/// once computed; [`DocumentStructure::sanitize`] is the single place
/// untrusted values are repaired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentStructure {
    #[schemars(description = "Detected statement type")]
    pub statement_type: StatementType,

    #[serde(deserialize_with = "deserialize_confidence")]
    #[schemars(description = "Overall structure confidence, 0-100")]
    pub confidence: u8,

    #[schemars(description = "Row indices that contain column headers")]
    pub header_rows: Vec<usize>,

    #[schemars(description = "Row indices that contain grand totals")]
    pub total_rows: Vec<usize>,

    #[schemars(description = "Row indices that contain subtotals")]
    pub subtotal_rows: Vec<usize>,

    #[schemars(description = "First data row, inclusive")]
    pub data_start_row: usize,

    #[schemars(description = "Last data row, inclusive")]
    pub data_end_row: usize,

    pub account_columns: AccountColumns,

    #[schemars(description = "Value columns, one per reporting period")]
    pub period_columns: Vec<PeriodColumn>,

    #[schemars(description = "ISO-4217 currency code, e.g. USD or EUR")]
    pub currency: String,

    #[schemars(description = "Free-text explanation of the analysis; diagnostic only, never parsed")]
    pub reasoning: String,
}

impl Default for DocumentStructure {
    fn default() -> Self {
        Self {
            statement_type: StatementType::Unknown,
            confidence: 0,
            header_rows: Vec::new(),
            total_rows: Vec::new(),
            subtotal_rows: Vec::new(),
            data_start_row: 0,
            data_end_row: 0,
            account_columns: AccountColumns::default(),
            period_columns: Vec::new(),
            currency: "USD".to_string(),
            reasoning: String::new(),
        }
    }
}

impl DocumentStructure {
    /// Repairs the structure against the actual table dimensions.
    /// Spreadsheet input is untrusted, so every invariant violation is
    /// clamped or defaulted rather than rejected.
    pub fn sanitize(&mut self, row_count: usize, column_count: usize) {
        self.confidence = self.confidence.min(100);
        self.account_columns.confidence = self.account_columns.confidence.min(100);

        if row_count == 0 {
            self.data_start_row = 0;
            self.data_end_row = 0;
            self.period_columns.clear();
            return;
        }

        self.data_end_row = self.data_end_row.min(row_count - 1);
        if self.data_start_row > self.data_end_row {
            self.data_start_row = self.data_end_row;
        }

        self.header_rows.retain(|r| *r < row_count);
        self.total_rows.retain(|r| *r < row_count);
        self.subtotal_rows.retain(|r| *r < row_count);

        if let Some(c) = self.account_columns.name_column {
            if c >= column_count {
                self.account_columns.name_column = None;
            }
        }
        if let Some(c) = self.account_columns.code_column {
            if c >= column_count {
                self.account_columns.code_column = None;
            }
        }

        let mut seen = std::collections::BTreeSet::new();
        self.period_columns.retain(|p| {
            p.column_index < column_count && seen.insert(p.column_index)
        });
        for period in &mut self.period_columns {
            period.confidence = period.confidence.min(100);
        }

        let currency = self.currency.trim().to_ascii_uppercase();
        self.currency = if currency.len() == 3 && currency.bytes().all(|b| b.is_ascii_alphabetic())
        {
            currency
        } else {
            "USD".to_string()
        };
    }
}

/// A lower-ranked candidate category for one line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AlternativeCategory {
    pub category: String,

    #[serde(deserialize_with = "deserialize_confidence")]
    pub confidence: u8,
}

impl Default for AlternativeCategory {
    fn default() -> Self {
        Self {
            category: String::new(),
            confidence: 0,
        }
    }
}

/// The classification assigned to one extracted line item. Created once
/// per account; afterwards only the validation engine's apply pass
/// mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountClassification {
    #[schemars(description = "The account name exactly as it appears in the source row")]
    pub account_name: String,

    #[schemars(description = "Zero-based row index in the source table")]
    pub row_index: usize,

    #[schemars(description = "Monetary value on the row, if one was present")]
    pub amount: Option<f64>,

    #[schemars(description = "Category taxonomy key, lowercase with underscores")]
    pub suggested_category: String,

    #[schemars(description = "true when the account represents money received")]
    pub is_inflow: bool,

    #[serde(deserialize_with = "deserialize_confidence")]
    #[schemars(description = "Classification confidence, 0-100")]
    pub confidence: u8,

    #[schemars(description = "Short explanation of why this category was chosen")]
    pub reasoning: String,

    #[schemars(description = "Other plausible categories, best first")]
    pub alternative_categories: Vec<AlternativeCategory>,

    #[schemars(description = "true when the row is a total or subtotal line")]
    pub is_total: bool,

    #[schemars(description = "true when the row is a section header carrying no value")]
    pub is_section_header: bool,

    #[schemars(description = "true when the row value is a percentage rather than an amount")]
    pub is_percentage: bool,

    #[schemars(description = "Name of the parent account a total row sums, if declared")]
    pub parent_account: Option<String>,
}

impl Default for AccountClassification {
    fn default() -> Self {
        Self {
            account_name: String::new(),
            row_index: 0,
            amount: None,
            suggested_category: String::new(),
            is_inflow: false,
            confidence: 0,
            reasoning: String::new(),
            alternative_categories: Vec::new(),
            is_total: false,
            is_section_header: false,
            is_percentage: false,
            parent_account: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Which classification field a correction touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionField {
    IsTotal,
    IsSectionHeader,
    Category,
    IsInflow,
}

impl CorrectionField {
    /// Category and polarity changes alter the meaning of the batch,
    /// so they weigh more in the manual-review decision.
    pub fn is_critical(self) -> bool {
        matches!(self, CorrectionField::Category | CorrectionField::IsInflow)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correction {
    pub row_index: usize,
    pub field: CorrectionField,
    pub original_value: String,
    pub corrected_value: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub row_index: usize,
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

/// The outcome of one validation pass over a classification batch.
/// Recomputed fresh on every pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub corrections: Vec<Correction>,
    pub warnings: Vec<Warning>,

    /// Aggregate batch confidence in [0.0, 1.0].
    pub confidence: f64,

    pub requires_manual_review: bool,
}

/// Accepts any JSON number for a confidence field and clamps it into
/// 0-100. The completion service does not reliably honor the schema, so
/// fractions and out-of-range values must not poison a whole batch.
fn deserialize_confidence<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() {
        return Ok(0);
    }
    Ok(raw.clamp(0.0, 100.0).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_statement_type_defaults() {
        let parsed: StatementType = serde_json::from_str("\"income_statement\"").unwrap();
        assert_eq!(parsed, StatementType::Unknown);

        let parsed: StatementType = serde_json::from_str("\"profit_loss\"").unwrap();
        assert_eq!(parsed, StatementType::ProfitLoss);
    }

    #[test]
    fn test_confidence_is_clamped_not_rejected() {
        let parsed: DocumentStructure =
            serde_json::from_str(r#"{"statementType":"profit_loss","confidence":250}"#).unwrap();
        assert_eq!(parsed.confidence, 100);

        let parsed: DocumentStructure =
            serde_json::from_str(r#"{"confidence":0.92}"#).unwrap();
        assert_eq!(parsed.confidence, 1);
    }

    #[test]
    fn test_missing_fields_coerce_to_defaults() {
        let parsed: DocumentStructure = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.statement_type, StatementType::Unknown);
        assert!(parsed.period_columns.is_empty());
        assert_eq!(parsed.currency, "USD");
    }

    #[test]
    fn test_sanitize_repairs_row_bounds() {
        let mut structure = DocumentStructure {
            data_start_row: 10,
            data_end_row: 3,
            ..DocumentStructure::default()
        };
        structure.sanitize(5, 4);
        assert_eq!(structure.data_end_row, 3);
        assert_eq!(structure.data_start_row, 3);
    }

    #[test]
    fn test_sanitize_drops_duplicate_and_out_of_range_periods() {
        let mut structure = DocumentStructure::default();
        structure.period_columns = vec![
            PeriodColumn {
                column_index: 1,
                ..PeriodColumn::default()
            },
            PeriodColumn {
                column_index: 1,
                ..PeriodColumn::default()
            },
            PeriodColumn {
                column_index: 9,
                ..PeriodColumn::default()
            },
        ];
        structure.sanitize(10, 4);
        assert_eq!(structure.period_columns.len(), 1);
        assert_eq!(structure.period_columns[0].column_index, 1);
    }

    #[test]
    fn test_sanitize_normalizes_currency() {
        let mut structure = DocumentStructure {
            currency: "usd ".to_string(),
            ..DocumentStructure::default()
        };
        structure.sanitize(2, 2);
        assert_eq!(structure.currency, "USD");

        let mut structure = DocumentStructure {
            currency: "dollars".to_string(),
            ..DocumentStructure::default()
        };
        structure.sanitize(2, 2);
        assert_eq!(structure.currency, "USD");
    }
}
