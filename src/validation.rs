//! Deterministic safety net over the probabilistic classifier: detects
//! and fixes rule violations in a classification batch, scores the
//! batch, and decides whether a human needs to look at it. Pure: no
//! I/O, no external calls.

use std::collections::HashMap;

use regex::Regex;

use crate::schema::{
    AccountClassification, Correction, CorrectionField, Severity, StatementType, ValidationResult,
    Warning,
};
use crate::taxonomy::{CategoryCatalog, CategoryGroup, Locale};

/// Keywords that mark a row as a total or subtotal, in either language.
const TOTAL_KEYWORDS: &[&str] = &["total", "subtotal", "suma", "grand total", "gran total"];

/// Top-level statement terms that identify section-header rows.
const SECTION_TERMS: &[&str] = &[
    "revenue",
    "revenues",
    "income",
    "expenses",
    "operating expenses",
    "cost of sales",
    "other income",
    "assets",
    "liabilities",
    "equity",
    "ingresos",
    "gastos",
    "costos",
    "egresos",
    "activos",
    "pasivos",
    "patrimonio",
    "operating activities",
    "investing activities",
    "financing activities",
    "actividades de operación",
    "actividades de operacion",
];

/// Category keys too vague to be useful on a dashboard.
const GENERIC_CATEGORIES: &[&str] = &[
    "other_revenue",
    "other_expense",
    "other_income",
    "miscellaneous",
    "uncategorized",
];

const RECEIPT_TERMS: &[&str] = &["receipt", "collection", "cobro", "cobranza", "recaud"];
const PAYMENT_TERMS: &[&str] = &["payment", "disbursement", "pago", "desembolso"];

/// Substring → sharper category, tried in order against account names
/// still carrying a generic category.
const SHARPEN_RULES: &[(&str, &str)] = &[
    ("salar", "personnel_costs"),
    ("wage", "personnel_costs"),
    ("sueldo", "personnel_costs"),
    ("nómina", "personnel_costs"),
    ("nomina", "personnel_costs"),
    ("payroll", "personnel_costs"),
    ("rent", "rent_expense"),
    ("lease", "rent_expense"),
    ("alquiler", "rent_expense"),
    ("insurance", "insurance_expense"),
    ("seguro", "insurance_expense"),
    ("advert", "marketing_expense"),
    ("marketing", "marketing_expense"),
    ("publicidad", "marketing_expense"),
    ("utilit", "utilities_expense"),
    ("electric", "utilities_expense"),
    ("deprec", "depreciation_amortization"),
    ("amortiz", "depreciation_amortization"),
    ("travel", "travel_expense"),
    ("viatic", "travel_expense"),
    ("viátic", "travel_expense"),
    ("tax", "tax_expense"),
    ("impuesto", "tax_expense"),
    ("service", "service_revenue"),
    ("servicio", "service_revenue"),
];

const MAGNITUDE_LIMIT: f64 = 1e12;
const HIERARCHY_TOLERANCE: f64 = 0.01;

/// True when a row label *starts* with a total keyword. Used upstream by
/// account extraction so total rows never reach the classifiers.
pub(crate) fn is_total_label(name: &str) -> bool {
    let lowered = name.trim().to_lowercase();
    ["total", "subtotal", "suma"]
        .iter()
        .any(|k| lowered.starts_with(k))
}

fn contains_total_keyword(name: &str) -> bool {
    let lowered = name.to_lowercase();
    TOTAL_KEYWORDS.iter().any(|k| lowered.contains(k))
}

fn is_section_name(name: &str) -> bool {
    let lowered = name.trim().to_lowercase();
    SECTION_TERMS
        .iter()
        .any(|t| lowered == *t || lowered.starts_with(t))
}

/// Penalty and review-threshold constants. The values mirror the tuning
/// the product shipped with; they are deliberately configuration, not
/// per-call parameters.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub penalty_total_flag: f64,
    pub penalty_missing_total_flag: f64,
    pub penalty_header_fix: f64,
    pub penalty_polarity_fix: f64,
    pub review_high_warnings: usize,
    pub review_max_corrections: usize,
    pub review_max_critical_corrections: usize,
    pub review_confidence_shift: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            penalty_total_flag: -0.05,
            penalty_missing_total_flag: -0.03,
            penalty_header_fix: -0.02,
            penalty_polarity_fix: -0.02,
            review_high_warnings: 2,
            review_max_corrections: 10,
            review_max_critical_corrections: 5,
            review_confidence_shift: -0.2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub document_type: Option<StatementType>,
    pub language: Option<Locale>,
}

#[derive(Debug, Clone)]
pub struct ValidatedBatch {
    pub results: Vec<AccountClassification>,
    pub validation: ValidationResult,
}

pub struct ValidationEngine<'a> {
    catalog: &'a CategoryCatalog,
    config: ValidationConfig,
}

impl<'a> ValidationEngine<'a> {
    pub fn new(catalog: &'a CategoryCatalog) -> Self {
        Self {
            catalog,
            config: ValidationConfig::default(),
        }
    }

    pub fn with_config(catalog: &'a CategoryCatalog, config: ValidationConfig) -> Self {
        Self { catalog, config }
    }

    /// Runs all rules against the batch and applies the corrections.
    /// Detection reads original values only; mutations happen in a
    /// single pass afterwards so rule order can never observe a
    /// half-corrected batch.
    pub fn validate(
        &self,
        results: Vec<AccountClassification>,
        context: &ValidationContext,
    ) -> ValidatedBatch {
        let mut corrections: Vec<Correction> = Vec::new();
        let mut warnings: Vec<Warning> = Vec::new();
        let mut penalty = 0.0f64;

        let statement_type = context.document_type.unwrap_or(StatementType::Unknown);

        let mut scored_rows = 0usize;
        let mut confidence_sum = 0.0f64;

        for row in &results {
            if skip_row(row) {
                continue;
            }
            scored_rows += 1;
            confidence_sum += f64::from(row.confidence) / 100.0;

            self.check_total_flag(row, &mut corrections, &mut penalty);
            self.check_section_header(row, &mut corrections, &mut warnings, &mut penalty);
            self.check_generic_category(row, &mut corrections, &mut warnings);
            self.check_polarity(row, statement_type, &mut corrections, &mut warnings, &mut penalty);
            check_numeric_sanity(row, &mut warnings);
        }

        check_hierarchy(&results, &mut warnings);

        let mut results = results;
        apply_corrections(&mut results, &corrections);

        let mean = if scored_rows > 0 {
            confidence_sum / scored_rows as f64
        } else {
            1.0
        };
        let confidence = (mean + penalty).clamp(0.0, 1.0);

        let high_warnings = warnings
            .iter()
            .filter(|w| w.severity == Severity::High)
            .count();
        let critical_corrections = corrections
            .iter()
            .filter(|c| c.field.is_critical())
            .count();

        let requires_manual_review = high_warnings > self.config.review_high_warnings
            || corrections.len() > self.config.review_max_corrections
            || critical_corrections > self.config.review_max_critical_corrections
            || penalty < self.config.review_confidence_shift;

        if !corrections.is_empty() || !warnings.is_empty() {
            log::debug!(
                "validation: {} corrections, {} warnings ({} high), confidence {:.2}, review={}",
                corrections.len(),
                warnings.len(),
                high_warnings,
                confidence,
                requires_manual_review
            );
        }

        ValidatedBatch {
            results,
            validation: ValidationResult {
                corrections,
                warnings,
                confidence,
                requires_manual_review,
            },
        }
    }

    fn check_total_flag(
        &self,
        row: &AccountClassification,
        corrections: &mut Vec<Correction>,
        penalty: &mut f64,
    ) {
        let has_keyword = contains_total_keyword(&row.account_name);
        if row.is_total && !has_keyword {
            corrections.push(correction(
                row,
                CorrectionField::IsTotal,
                "true",
                "false",
                "Marked as total but the name contains no total keyword",
            ));
            *penalty += self.config.penalty_total_flag;
        } else if !row.is_total && has_keyword && has_amount(row) {
            corrections.push(correction(
                row,
                CorrectionField::IsTotal,
                "false",
                "true",
                "Name contains a total keyword and the row carries a value",
            ));
            *penalty += self.config.penalty_missing_total_flag;
        }
    }

    fn check_section_header(
        &self,
        row: &AccountClassification,
        corrections: &mut Vec<Correction>,
        warnings: &mut Vec<Warning>,
        penalty: &mut f64,
    ) {
        if row.is_section_header && has_amount(row) {
            corrections.push(correction(
                row,
                CorrectionField::IsSectionHeader,
                "true",
                "false",
                "Section headers must not carry a value",
            ));
            warnings.push(warning(
                row,
                "isSectionHeader",
                format!(
                    "'{}' was marked as a section header but has an amount",
                    row.account_name
                ),
                Severity::Medium,
            ));
            *penalty += self.config.penalty_header_fix;
        } else if !row.is_section_header
            && !row.is_total
            && is_section_name(&row.account_name)
            && !has_amount(row)
        {
            corrections.push(correction(
                row,
                CorrectionField::IsSectionHeader,
                "false",
                "true",
                "Top-level accounting term with no value is a section header",
            ));
            *penalty += self.config.penalty_header_fix;
        }
    }

    fn check_generic_category(
        &self,
        row: &AccountClassification,
        corrections: &mut Vec<Correction>,
        warnings: &mut Vec<Warning>,
    ) {
        if row.is_total || row.is_section_header {
            return;
        }
        if !GENERIC_CATEGORIES.contains(&row.suggested_category.as_str()) {
            return;
        }

        if let Some(sharper) = sharpen_category(&row.account_name, self.catalog) {
            if sharper != row.suggested_category {
                corrections.push(correction(
                    row,
                    CorrectionField::Category,
                    &row.suggested_category,
                    sharper,
                    "Account name suggests a more specific category",
                ));
                return;
            }
        }
        warnings.push(warning(
            row,
            "category",
            format!(
                "'{}' kept generic category '{}'",
                row.account_name, row.suggested_category
            ),
            Severity::Medium,
        ));
    }

    fn check_polarity(
        &self,
        row: &AccountClassification,
        statement_type: StatementType,
        corrections: &mut Vec<Correction>,
        warnings: &mut Vec<Warning>,
        penalty: &mut f64,
    ) {
        match statement_type {
            StatementType::ProfitLoss => {
                let group = self
                    .catalog
                    .get(&row.suggested_category)
                    .map(|d| d.group);

                let revenue_like = matches!(
                    group,
                    Some(CategoryGroup::Revenue) | Some(CategoryGroup::OtherIncome)
                );
                let expense_like = matches!(
                    group,
                    Some(CategoryGroup::CostOfSales)
                        | Some(CategoryGroup::OperatingExpenses)
                        | Some(CategoryGroup::OtherExpenses)
                );

                if revenue_like && matches!(row.amount, Some(a) if a < 0.0) {
                    warnings.push(warning(
                        row,
                        "amount",
                        format!(
                            "Revenue-classified '{}' has a negative amount",
                            row.account_name
                        ),
                        Severity::High,
                    ));
                }
                if revenue_like && !row.is_inflow {
                    corrections.push(correction(
                        row,
                        CorrectionField::IsInflow,
                        "false",
                        "true",
                        "Revenue and income categories are inflows",
                    ));
                    *penalty += self.config.penalty_polarity_fix;
                }
                if expense_like && row.is_inflow {
                    corrections.push(correction(
                        row,
                        CorrectionField::IsInflow,
                        "true",
                        "false",
                        "Expense and cost categories are outflows",
                    ));
                    *penalty += self.config.penalty_polarity_fix;
                }
            }
            StatementType::CashFlow => {
                let lowered = row.account_name.to_lowercase();
                if RECEIPT_TERMS.iter().any(|t| lowered.contains(t)) {
                    if !row.is_inflow {
                        corrections.push(correction(
                            row,
                            CorrectionField::IsInflow,
                            "false",
                            "true",
                            "Receipt/collection wording forces an inflow",
                        ));
                        *penalty += self.config.penalty_polarity_fix;
                    }
                } else if PAYMENT_TERMS.iter().any(|t| lowered.contains(t)) && row.is_inflow {
                    corrections.push(correction(
                        row,
                        CorrectionField::IsInflow,
                        "true",
                        "false",
                        "Payment/disbursement wording forces an outflow",
                    ));
                    *penalty += self.config.penalty_polarity_fix;
                }
            }
            _ => {}
        }
    }
}

fn skip_row(row: &AccountClassification) -> bool {
    row.account_name.trim().is_empty() && !has_amount(row)
}

fn has_amount(row: &AccountClassification) -> bool {
    matches!(row.amount, Some(a) if a != 0.0)
}

fn correction(
    row: &AccountClassification,
    field: CorrectionField,
    original: &str,
    corrected: &str,
    reason: &str,
) -> Correction {
    Correction {
        row_index: row.row_index,
        field,
        original_value: original.to_string(),
        corrected_value: corrected.to_string(),
        reason: reason.to_string(),
    }
}

fn warning(
    row: &AccountClassification,
    field: &str,
    message: String,
    severity: Severity,
) -> Warning {
    Warning {
        row_index: row.row_index,
        field: field.to_string(),
        message,
        severity,
    }
}

/// Word-boundary match so that e.g. "Current Assets" never hits the
/// "rent" sharpening rule.
fn sharpen_category(name: &str, catalog: &CategoryCatalog) -> Option<&'static str> {
    let lowered = name.to_lowercase();
    for (term, category) in SHARPEN_RULES {
        let matched = if term.len() <= 5 {
            Regex::new(&format!(r"\b{}", regex::escape(term)))
                .map(|re| re.is_match(&lowered))
                .unwrap_or(false)
        } else {
            lowered.contains(term)
        };
        if matched && catalog.contains(category) {
            return Some(category);
        }
    }
    None
}

fn check_numeric_sanity(row: &AccountClassification, warnings: &mut Vec<Warning>) {
    let amount = match row.amount {
        Some(a) => a,
        None => return,
    };

    let percentage = row.is_percentage || {
        let lowered = row.account_name.to_lowercase();
        lowered.contains('%')
            || lowered.contains("percent")
            || lowered.contains("porcentaje")
            || lowered.contains("margin")
            || lowered.contains("margen")
    };

    if amount.abs() > MAGNITUDE_LIMIT {
        warnings.push(warning(
            row,
            "amount",
            format!(
                "Amount {:.0} on '{}' exceeds plausible magnitude; likely a unit or entry error",
                amount, row.account_name
            ),
            Severity::High,
        ));
    } else if percentage {
        if amount.abs() > 100.0 {
            warnings.push(warning(
                row,
                "amount",
                format!("Percentage row '{}' is outside ±100", row.account_name),
                Severity::Medium,
            ));
        }
    } else if amount != 0.0 && amount.abs() < 1.0 {
        warnings.push(warning(
            row,
            "amount",
            format!("Amount below 1 on '{}'", row.account_name),
            Severity::Low,
        ));
    }
}

fn check_hierarchy(results: &[AccountClassification], warnings: &mut Vec<Warning>) {
    for row in results {
        if !row.is_total {
            continue;
        }
        let (parent, total) = match (&row.parent_account, row.amount) {
            (Some(parent), Some(total)) => (parent, total),
            _ => continue,
        };

        let children: Vec<f64> = results
            .iter()
            .filter(|r| !r.is_total && r.parent_account.as_deref() == Some(parent.as_str()))
            .filter_map(|r| r.amount)
            .collect();
        if children.is_empty() {
            continue;
        }

        let sum: f64 = children.iter().sum();
        let delta = (sum - total).abs();
        if delta > HIERARCHY_TOLERANCE {
            warnings.push(warning(
                row,
                "amount",
                format!(
                    "Total '{}' ({:.2}) differs from the sum of {} child rows ({:.2}) by {:.2}",
                    row.account_name,
                    total,
                    children.len(),
                    sum,
                    delta
                ),
                Severity::High,
            ));
        }
    }
}

fn apply_corrections(results: &mut [AccountClassification], corrections: &[Correction]) {
    let positions: HashMap<usize, usize> = results
        .iter()
        .enumerate()
        .map(|(pos, r)| (r.row_index, pos))
        .collect();

    for c in corrections {
        let row = match positions.get(&c.row_index) {
            Some(pos) => &mut results[*pos],
            None => continue,
        };
        match c.field {
            CorrectionField::IsTotal => row.is_total = c.corrected_value == "true",
            CorrectionField::IsSectionHeader => {
                row.is_section_header = c.corrected_value == "true"
            }
            CorrectionField::Category => row.suggested_category = c.corrected_value.clone(),
            CorrectionField::IsInflow => row.is_inflow = c.corrected_value == "true",
        }
    }
}
