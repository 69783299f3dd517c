//! Deterministic, keyword-driven account classifier. This is the
//! degraded mode of the pipeline: no external calls, always terminates,
//! total over every non-empty account name.

use serde::{Deserialize, Serialize};

use crate::keywords::{CATEGORY_KEYWORDS, GENERIC_EXPENSE_TERMS};
use crate::schema::{AccountClassification, StatementType};
use crate::table::ExtractedAccount;
use crate::taxonomy::CategoryCatalog;

const SCORE_EXACT: u32 = 6;
const SCORE_PREFIX: u32 = 4;
const SCORE_SUBSTRING: u32 = 2;

const BASE_CONFIDENCE: u32 = 75;
const MAX_CONFIDENCE: u32 = 95;
const CONTRA_REVENUE_CAP: u8 = 60;
const POSITIVE_EXPENSE_CAP: u8 = 65;

/// How the fallback arrived at its answer, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Keyword,
    ValueSign,
    AccountCode,
    GenericVocabulary,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalClassification {
    pub category: String,
    pub is_inflow: bool,
    pub confidence: u8,
    pub reasoning: String,
    pub method: MatchMethod,
}

impl LocalClassification {
    /// Lifts a local result into the shared classification shape used
    /// by the rest of the pipeline.
    pub fn into_classification(self, account: &ExtractedAccount) -> AccountClassification {
        AccountClassification {
            account_name: account.name.clone(),
            row_index: account.row_index,
            amount: account.value,
            suggested_category: self.category,
            is_inflow: self.is_inflow,
            confidence: self.confidence,
            reasoning: self.reasoning,
            ..AccountClassification::default()
        }
    }
}

pub struct LocalClassifier<'a> {
    catalog: &'a CategoryCatalog,
}

impl<'a> LocalClassifier<'a> {
    pub fn new(catalog: &'a CategoryCatalog) -> Self {
        Self { catalog }
    }

    pub fn classify(
        &self,
        name: &str,
        value: Option<f64>,
        context: Option<StatementType>,
    ) -> LocalClassification {
        let normalized = name.trim().to_lowercase();

        if let Some(result) = self.keyword_match(&normalized, value, context) {
            return result;
        }

        // No keyword fired: fall through the cheaper signals in order.
        if matches!(value, Some(v) if v < 0.0) {
            return LocalClassification {
                category: "other_expense".to_string(),
                is_inflow: false,
                confidence: 70,
                reasoning: "No keyword match; negative value indicates an expense".to_string(),
                method: MatchMethod::ValueSign,
            };
        }

        if let Some(result) = account_code_match(&normalized) {
            return result;
        }

        if GENERIC_EXPENSE_TERMS.iter().any(|t| normalized.contains(t)) {
            return LocalClassification {
                category: "other_expense".to_string(),
                is_inflow: false,
                confidence: 60,
                reasoning: "Generic expense vocabulary in account name".to_string(),
                method: MatchMethod::GenericVocabulary,
            };
        }

        let negative = matches!(value, Some(v) if v < 0.0);
        LocalClassification {
            category: if negative { "other_expense" } else { "other_income" }.to_string(),
            is_inflow: !negative,
            confidence: 40,
            reasoning: "No classification signal; defaulted by value sign".to_string(),
            method: MatchMethod::Default,
        }
    }

    fn keyword_match(
        &self,
        normalized: &str,
        value: Option<f64>,
        context: Option<StatementType>,
    ) -> Option<LocalClassification> {
        let mut best: Option<(u32, &'static str, &'static str)> = None;

        for rule in CATEGORY_KEYWORDS {
            let definition = match self.catalog.get(rule.category) {
                Some(d) => d,
                None => continue,
            };
            if let Some(st) = context {
                if st != StatementType::Unknown && definition.statement_type != st {
                    continue;
                }
            }
            if rule.exclusions.iter().any(|e| normalized.contains(e)) {
                continue;
            }

            let mut score = 0u32;
            let mut strongest: Option<&'static str> = None;
            for keyword in rule.en.iter().chain(rule.es.iter()) {
                let tier = if normalized == *keyword {
                    SCORE_EXACT
                } else if normalized.starts_with(keyword) {
                    SCORE_PREFIX
                } else if normalized.contains(keyword) {
                    SCORE_SUBSTRING
                } else {
                    continue;
                };
                score += tier;
                if strongest.is_none() {
                    strongest = Some(keyword);
                }
            }

            if score > 0 && best.map(|(s, _, _)| score > s).unwrap_or(true) {
                best = Some((score, rule.category, strongest.unwrap_or(rule.en[0])));
            }
        }

        let (score, category, keyword) = best?;
        let definition = self.catalog.get(category)?;
        let scored_confidence = (BASE_CONFIDENCE + score).min(MAX_CONFIDENCE) as u8;

        let (is_inflow, confidence, note) = match value {
            Some(v) if definition.is_inflow && v < 0.0 => (
                false,
                scored_confidence.min(CONTRA_REVENUE_CAP),
                "; negative value suggests a contra/refund entry",
            ),
            Some(v) if !definition.is_inflow && v > 0.0 => {
                (false, scored_confidence.min(POSITIVE_EXPENSE_CAP), "")
            }
            _ => (definition.is_inflow, scored_confidence, ""),
        };

        Some(LocalClassification {
            category: category.to_string(),
            is_inflow,
            confidence,
            reasoning: format!("Keyword match on '{}'{}", keyword, note),
            method: MatchMethod::Keyword,
        })
    }
}

/// Chart-of-account numbering convention: 4xxx revenue, 5xxx cost of
/// sales, 6xxx operating expenses.
fn account_code_match(normalized: &str) -> Option<LocalClassification> {
    let code: String = normalized
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if code.len() < 3 {
        return None;
    }

    let (category, is_inflow, confidence) = match code.as_bytes()[0] {
        b'4' => ("sales_revenue", true, 80),
        b'5' => ("cost_of_sales", false, 78),
        b'6' => ("operating_expense", false, 75),
        _ => return None,
    };

    Some(LocalClassification {
        category: category.to_string(),
        is_inflow,
        confidence,
        reasoning: format!("Account code prefix '{}'", &code[..1]),
        method: MatchMethod::AccountCode,
    })
}
