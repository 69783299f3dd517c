//! Instruction sets for the completion calls. The accounting rules in
//! the classification prompt are the same rules the validation engine
//! re-enforces afterwards; model compliance is hoped for, never
//! assumed.

use crate::llm::classifier::ClassificationContext;
use crate::schema::StatementType;
use crate::table::ExtractedAccount;

pub const STRUCTURE_SYSTEM: &str = r#"
You are a Financial Spreadsheet Structure Analyzer.

You receive a sample of rows from a spreadsheet that contains a financial
statement (profit and loss, balance sheet, or cash flow). Account names
may be in English or Spanish.

## YOUR MISSION
Determine the layout of the full document from the sample:
1. `statementType`: one of "profit_loss", "balance_sheet", "cash_flow",
   or "unknown".
2. `headerRows`: row indices holding column headers (often just row 0).
3. `totalRows` / `subtotalRows`: rows whose label starts with Total,
   Subtotal, Suma, Gran Total, etc.
4. `dataStartRow` / `dataEndRow`: the inclusive range of rows holding
   account line items. The document may be longer than the sample; if
   the data clearly continues, extrapolate dataEndRow past the sample.
5. `accountColumns`: which column holds account codes (numeric, e.g.
   4000) and which holds account names.
6. `periodColumns`: every column holding monetary values, with its
   period label from the header and a periodType of "month", "quarter",
   "year" or "custom".
7. `currency`: the ISO-4217 code. Look for currency symbols or header
   text; default to "USD" when there is no signal.

## RULES
- Row and column indices are zero-based.
- Section headers (Revenue, Expenses, Ingresos, Gastos) carry no value
  and are NOT data rows, but they sit inside the data range.
- Every confidence is an integer 0-100.
- `reasoning` is a short free-text explanation for a human reviewer.

## OUTPUT
Return ONLY a JSON object with exactly the fields above. No markdown.
"#;

pub const CLASSIFY_SYSTEM: &str = r#"
You are a Financial Account Classifier for small-business statements in
English and Spanish.

You receive a numbered list of account line items. Classify every one.

## CATEGORY RULES
- Use lowercase taxonomy keys: sales_revenue, service_revenue,
  cost_of_sales, personnel_costs, rent_expense, utilities_expense,
  marketing_expense, insurance_expense, office_supplies,
  professional_fees, travel_expense, depreciation_amortization,
  interest_income, interest_expense, tax_expense, other_income,
  other_expense, cash_and_equivalents, accounts_receivable, inventory,
  fixed_assets, accounts_payable, loans_payable, share_capital,
  retained_earnings, customer_collections, supplier_payments,
  payroll_payments, tax_payments, and the other keys of the same form.
- Prefer a specific category; use other_income / other_expense only as
  a last resort.

## ACCOUNTING RULES (the validator re-checks all of these)
1. Rows whose text contains total/subtotal/suma are totals
   (`isTotal: true`); rows without such wording never are.
2. Section headers (Revenue, Expenses, Ingresos, Gastos) carry no
   amount: `isSectionHeader: true` and no classification weight.
3. Revenue and income categories are inflows (`isInflow: true`);
   expense and cost categories are outflows. A negative or
   parenthesized value marks a likely expense.
4. On cash-flow statements, receipt/collection/cobro wording means
   inflow; payment/disbursement/pago wording means outflow.
5. `confidence` is an integer 0-100. If unsure between two categories,
   put the runner-up in `alternativeCategories`.

## OUTPUT
Return ONLY a JSON array with one object per input line, in input
order, each with: accountName, rowIndex, amount, suggestedCategory,
isInflow, confidence, reasoning, alternativeCategories, isTotal,
isSectionHeader, isPercentage, parentAccount.
"#;

pub const COMBINED_SYSTEM: &str = r#"
You are a Financial Spreadsheet Analyzer performing structure analysis
and account classification in a single pass.

Apply the structure rules to the sampled rows, then classify every
account line item you find inside the detected data range. Skip rows
whose label starts with Total/Subtotal/Suma and rows with no account
name.

Follow the same structure fields and accounting rules as the dedicated
analysis and classification tasks.

## OUTPUT
Return ONLY a JSON object:
{ "structure": { ...document structure fields... },
  "classifications": [ ...one object per classified line item... ] }
"#;

pub fn structure_prompt(sample: &str, file_name_hint: Option<&str>) -> String {
    let mut prompt = String::new();
    if let Some(hint) = file_name_hint {
        prompt.push_str(&format!("Original file name: \"{}\"\n\n", hint));
    }
    prompt.push_str("Spreadsheet sample (one line per row, cells separated by ' | '):\n\n");
    prompt.push_str(sample);
    prompt.push_str("\nAnalyze the structure and return the JSON object.");
    prompt
}

pub fn classification_prompt(
    accounts: &[ExtractedAccount],
    context: &ClassificationContext,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "Statement type: {}\n",
        statement_type_label(context.statement_type)
    ));
    if let Some(currency) = &context.currency {
        prompt.push_str(&format!("Currency: {}\n", currency));
    }
    prompt.push_str(&format!(
        "\nClassify these {} accounts:\n\n",
        accounts.len()
    ));

    for (position, account) in accounts.iter().enumerate() {
        let value = match account.value {
            Some(v) if v < 0.0 => format!(" (value: {}, negative - likely expense)", v),
            Some(v) => format!(" (value: {})", v),
            None => String::new(),
        };
        prompt.push_str(&format!(
            "{}. \"{}\" [row {}]{}\n",
            position + 1,
            account.name,
            account.row_index,
            value
        ));
    }

    prompt.push_str("\nReturn the JSON array.");
    prompt
}

pub fn combined_prompt(sample: &str, file_name_hint: Option<&str>) -> String {
    let mut prompt = structure_prompt(sample, file_name_hint);
    prompt.push_str("\nThen classify every account line item and return the combined JSON object.");
    prompt
}

fn statement_type_label(statement_type: StatementType) -> &'static str {
    match statement_type {
        StatementType::ProfitLoss => "profit and loss",
        StatementType::BalanceSheet => "balance sheet",
        StatementType::CashFlow => "cash flow",
        StatementType::Unknown => "unknown",
    }
}
