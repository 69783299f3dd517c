//! Context-aware category suggestions for interactive manual mapping.
//! Shares the keyword philosophy of the fallback classifier but scores
//! one locale at a time and folds in the enclosing section's context.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::keywords::CATEGORY_KEYWORDS;
use crate::taxonomy::{CategoryDefinition, CategoryGroup, Locale};

const SCORE_EXACT: i32 = 10;
const SCORE_CONTAINS: i32 = 5;
const SCORE_REVERSE_CONTAINS: i32 = 3;
const SCORE_WORD_BOUNDARY: i32 = 4;
const SECTION_BONUS_EXACT: i32 = 3;
const SECTION_BONUS_RELATED: i32 = 2;

const BAND_HIGH: i32 = 10;
const BAND_MEDIUM: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub category: String,
    pub band: ConfidenceBand,
    pub score: i32,
    pub reasoning: String,
}

/// Accounting domain inferred from a section label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionContext {
    Revenue,
    CostOfSales,
    OperatingExpenses,
    CashOperating,
    CashInvesting,
    CashFinancing,
}

/// Suggests the best category for `account_name` appearing under
/// `section_name`, restricted to `available` candidates. When
/// `required_inflow` is given, polarity-mismatched candidates are
/// excluded outright: an account under an "Outflows" section can never
/// be offered an inflow category.
pub fn suggest(
    account_name: &str,
    section_name: &str,
    available: &[&CategoryDefinition],
    locale: Locale,
    required_inflow: Option<bool>,
) -> Option<Suggestion> {
    let name = account_name.trim().to_lowercase();
    if name.is_empty() {
        return None;
    }
    let section = infer_section_context(section_name);

    let mut best: Option<(i32, &CategoryDefinition, String)> = None;
    for candidate in available {
        if let Some(required) = required_inflow {
            if candidate.is_inflow != required {
                continue;
            }
        }

        let keyword_score = keyword_score(&name, candidate, locale);
        if keyword_score == 0 {
            continue;
        }

        let bonus = section
            .map(|ctx| section_bonus(ctx, candidate.group))
            .unwrap_or(0);
        let score = keyword_score + bonus;

        if best.as_ref().map(|(s, _, _)| score > *s).unwrap_or(true) {
            let reasoning = if bonus > 0 {
                format!(
                    "Name matches '{}' and section '{}' agrees with its group",
                    candidate.label(locale),
                    section_name.trim()
                )
            } else {
                format!("Name matches '{}'", candidate.label(locale))
            };
            best = Some((score, candidate, reasoning));
        }
    }

    let (score, candidate, reasoning) = best?;
    let band = if score >= BAND_HIGH {
        ConfidenceBand::High
    } else if score >= BAND_MEDIUM {
        ConfidenceBand::Medium
    } else {
        ConfidenceBand::Low
    };

    Some(Suggestion {
        category: candidate.key.clone(),
        band,
        score,
        reasoning,
    })
}

fn keyword_score(name: &str, candidate: &CategoryDefinition, locale: Locale) -> i32 {
    let dictionary = CATEGORY_KEYWORDS
        .iter()
        .find(|k| k.category == candidate.key)
        .map(|k| k.for_locale(locale));

    let label = candidate.label(locale).to_lowercase();
    let mut score = 0;
    match dictionary {
        Some(keywords) => {
            for keyword in keywords {
                score += keyword_tier(name, keyword);
            }
        }
        // Custom categories carry no dictionary; their label is the keyword.
        None => score += keyword_tier(name, &label),
    }
    // The display label itself always counts once.
    if dictionary.is_some() && !label.is_empty() {
        score = score.max(keyword_tier(name, &label));
    }
    score
}

fn keyword_tier(name: &str, keyword: &str) -> i32 {
    if keyword.is_empty() {
        return 0;
    }
    if name == keyword {
        SCORE_EXACT
    } else if name.contains(keyword) {
        SCORE_CONTAINS
    } else if keyword.contains(name) {
        SCORE_REVERSE_CONTAINS
    } else if word_boundary_match(name, keyword) {
        SCORE_WORD_BOUNDARY
    } else {
        0
    }
}

/// Any significant word of the keyword appearing as a whole word in the
/// account name, e.g. keyword "interest income" against "income from
/// interest".
fn word_boundary_match(name: &str, keyword: &str) -> bool {
    keyword
        .split_whitespace()
        .filter(|w| w.len() > 3)
        .any(|word| {
            Regex::new(&format!(r"\b{}\b", regex::escape(word)))
                .map(|re| re.is_match(name))
                .unwrap_or(false)
        })
}

fn infer_section_context(section_name: &str) -> Option<SectionContext> {
    let section = section_name.trim().to_lowercase();
    if section.is_empty() {
        return None;
    }

    // Cost-of-sales first: "cost of sales" would otherwise hit "sales".
    const COST: &[&str] = &["cost of sales", "cost of goods", "costo de ventas", "direct costs"];
    const REVENUE: &[&str] = &["revenue", "income", "sales", "ingresos", "ventas"];
    const EXPENSES: &[&str] = &["expense", "operating expenses", "gastos", "egresos"];
    const CASH_OPERATING: &[&str] = &["operating activities", "actividades de operación", "actividades de operacion"];
    const CASH_INVESTING: &[&str] = &["investing", "inversión", "inversion"];
    const CASH_FINANCING: &[&str] = &["financing", "financiamiento"];

    let hit = |terms: &[&str]| terms.iter().any(|t| section.contains(t));

    if hit(CASH_OPERATING) {
        Some(SectionContext::CashOperating)
    } else if hit(CASH_INVESTING) {
        Some(SectionContext::CashInvesting)
    } else if hit(CASH_FINANCING) {
        Some(SectionContext::CashFinancing)
    } else if hit(COST) {
        Some(SectionContext::CostOfSales)
    } else if hit(EXPENSES) {
        Some(SectionContext::OperatingExpenses)
    } else if hit(REVENUE) {
        Some(SectionContext::Revenue)
    } else {
        None
    }
}

fn section_bonus(context: SectionContext, group: CategoryGroup) -> i32 {
    use CategoryGroup as G;
    use SectionContext as C;

    match (context, group) {
        (C::Revenue, G::Revenue)
        | (C::CostOfSales, G::CostOfSales)
        | (C::OperatingExpenses, G::OperatingExpenses)
        | (C::CashOperating, G::OperatingActivities)
        | (C::CashInvesting, G::InvestingActivities)
        | (C::CashFinancing, G::FinancingActivities) => SECTION_BONUS_EXACT,
        (C::Revenue, G::OtherIncome)
        | (C::CostOfSales, G::OperatingExpenses)
        | (C::OperatingExpenses, G::CostOfSales)
        | (C::OperatingExpenses, G::OtherExpenses) => SECTION_BONUS_RELATED,
        _ => 0,
    }
}
