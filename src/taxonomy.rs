use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, Result};
use crate::schema::StatementType;

/// Display language for labels and keyword dictionaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    En,
    Es,
}

/// What a row with this category represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Account,
    Section,
    Total,
}

/// Presentation group a category rolls up into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryGroup {
    Revenue,
    CostOfSales,
    OperatingExpenses,
    OtherIncome,
    OtherExpenses,
    Assets,
    Liabilities,
    Equity,
    OperatingActivities,
    InvestingActivities,
    FinancingActivities,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDefinition {
    pub key: String,
    pub label_en: String,
    pub label_es: String,
    pub is_inflow: bool,
    pub statement_type: StatementType,
    pub kind: CategoryKind,
    pub group: CategoryGroup,
    pub is_custom: bool,
}

impl CategoryDefinition {
    pub fn label(&self, locale: Locale) -> &str {
        match locale {
            Locale::En => &self.label_en,
            Locale::Es => &self.label_es,
        }
    }
}

/// A tenant-owned category created through the admin UI. Validated here,
/// persisted elsewhere; the pipeline only ever reads these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomCategory {
    pub company_id: String,
    pub key: String,
    pub label_en: String,
    pub label_es: String,
    pub is_inflow: bool,
    pub statement_type: StatementType,
    pub group: CategoryGroup,
}

/// Category keys are lowercase identifiers: `[a-z][a-z0-9_]*`.
pub fn validate_key(key: &str) -> Result<()> {
    let mut chars = key.chars();
    let valid = match chars.next() {
        Some(first) => {
            first.is_ascii_lowercase()
                && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ClassifierError::InvalidCategoryKey(key.to_string()))
    }
}

/// Validates a candidate custom category against the builtin catalog and
/// the tenant's existing custom categories. An ill-formed definition is
/// a contract violation, so this is one of the few hard-error paths in
/// the crate.
pub fn validate_custom(existing: &[CustomCategory], candidate: &CustomCategory) -> Result<()> {
    validate_key(&candidate.key)?;

    if CategoryCatalog::builtin().contains(&candidate.key) {
        return Err(ClassifierError::BuiltinCategoryCollision(
            candidate.key.clone(),
        ));
    }

    if existing
        .iter()
        .any(|c| c.company_id == candidate.company_id && c.key == candidate.key)
    {
        return Err(ClassifierError::DuplicateCustomCategory {
            key: candidate.key.clone(),
            company_id: candidate.company_id.clone(),
        });
    }

    if candidate.label_en.trim().is_empty() {
        return Err(ClassifierError::MissingCategoryLabel {
            key: candidate.key.clone(),
            locale: "en".to_string(),
        });
    }

    Ok(())
}

/// The category catalog: builtin definitions plus, per call, a merged
/// view with a tenant's custom categories.
#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    by_key: BTreeMap<String, CategoryDefinition>,
}

impl CategoryCatalog {
    /// The process-wide builtin catalog, built once and never mutated.
    pub fn builtin() -> &'static CategoryCatalog {
        static CATALOG: OnceLock<CategoryCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| CategoryCatalog {
            by_key: builtin_definitions()
                .into_iter()
                .map(|d| (d.key.clone(), d))
                .collect(),
        })
    }

    pub fn get(&self, key: &str) -> Option<&CategoryDefinition> {
        self.by_key.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryDefinition> {
        self.by_key.values()
    }

    /// Categories usable for line items of the given statement type.
    pub fn for_statement(&self, statement_type: StatementType) -> Vec<&CategoryDefinition> {
        self.by_key
            .values()
            .filter(|d| {
                d.statement_type == statement_type || statement_type == StatementType::Unknown
            })
            .collect()
    }

    /// Merged view including a tenant's custom categories, read fresh at
    /// call time. Each custom entry must already have passed
    /// [`validate_custom`]; the merge re-checks key format and builtin
    /// collisions so a bad record cannot slip in through persistence.
    pub fn with_custom(&self, custom: &[CustomCategory]) -> Result<CategoryCatalog> {
        let mut by_key = self.by_key.clone();
        for c in custom {
            validate_key(&c.key)?;
            if self.by_key.contains_key(&c.key) {
                return Err(ClassifierError::BuiltinCategoryCollision(c.key.clone()));
            }
            by_key.insert(
                c.key.clone(),
                CategoryDefinition {
                    key: c.key.clone(),
                    label_en: c.label_en.clone(),
                    label_es: c.label_es.clone(),
                    is_inflow: c.is_inflow,
                    statement_type: c.statement_type,
                    kind: CategoryKind::Account,
                    group: c.group,
                    is_custom: true,
                },
            );
        }
        Ok(CategoryCatalog { by_key })
    }
}

fn def(
    key: &str,
    label_en: &str,
    label_es: &str,
    is_inflow: bool,
    statement_type: StatementType,
    kind: CategoryKind,
    group: CategoryGroup,
) -> CategoryDefinition {
    CategoryDefinition {
        key: key.to_string(),
        label_en: label_en.to_string(),
        label_es: label_es.to_string(),
        is_inflow,
        statement_type,
        kind,
        group,
        is_custom: false,
    }
}

fn builtin_definitions() -> Vec<CategoryDefinition> {
    use CategoryGroup as G;
    use CategoryKind as K;
    use StatementType as S;

    vec![
        // Profit and loss: revenue
        def("sales_revenue", "Sales Revenue", "Ingresos por Ventas", true, S::ProfitLoss, K::Account, G::Revenue),
        def("service_revenue", "Service Revenue", "Ingresos por Servicios", true, S::ProfitLoss, K::Account, G::Revenue),
        def("other_revenue", "Other Revenue", "Otros Ingresos Operativos", true, S::ProfitLoss, K::Account, G::Revenue),
        def("interest_income", "Interest Income", "Ingresos Financieros", true, S::ProfitLoss, K::Account, G::OtherIncome),
        def("other_income", "Other Income", "Otros Ingresos", true, S::ProfitLoss, K::Account, G::OtherIncome),
        // Profit and loss: costs and expenses
        def("cost_of_sales", "Cost of Sales", "Costo de Ventas", false, S::ProfitLoss, K::Account, G::CostOfSales),
        def("materials_cost", "Materials", "Materiales", false, S::ProfitLoss, K::Account, G::CostOfSales),
        def("personnel_costs", "Personnel Costs", "Sueldos y Salarios", false, S::ProfitLoss, K::Account, G::OperatingExpenses),
        def("rent_expense", "Rent", "Alquiler", false, S::ProfitLoss, K::Account, G::OperatingExpenses),
        def("utilities_expense", "Utilities", "Servicios Públicos", false, S::ProfitLoss, K::Account, G::OperatingExpenses),
        def("marketing_expense", "Marketing & Advertising", "Marketing y Publicidad", false, S::ProfitLoss, K::Account, G::OperatingExpenses),
        def("insurance_expense", "Insurance", "Seguros", false, S::ProfitLoss, K::Account, G::OperatingExpenses),
        def("office_supplies", "Office Supplies", "Útiles de Oficina", false, S::ProfitLoss, K::Account, G::OperatingExpenses),
        def("professional_fees", "Professional Fees", "Honorarios Profesionales", false, S::ProfitLoss, K::Account, G::OperatingExpenses),
        def("travel_expense", "Travel", "Viáticos", false, S::ProfitLoss, K::Account, G::OperatingExpenses),
        def("operating_expense", "Operating Expense", "Gasto Operativo", false, S::ProfitLoss, K::Account, G::OperatingExpenses),
        def("depreciation_amortization", "Depreciation & Amortization", "Depreciación y Amortización", false, S::ProfitLoss, K::Account, G::OperatingExpenses),
        def("interest_expense", "Interest Expense", "Gastos Financieros", false, S::ProfitLoss, K::Account, G::OtherExpenses),
        def("tax_expense", "Income Tax", "Impuesto a la Renta", false, S::ProfitLoss, K::Account, G::OtherExpenses),
        def("other_expense", "Other Expense", "Otros Gastos", false, S::ProfitLoss, K::Account, G::OtherExpenses),
        def("miscellaneous", "Miscellaneous", "Varios", false, S::ProfitLoss, K::Account, G::OtherExpenses),
        // Profit and loss: sections and totals
        def("revenue", "Revenue", "Ingresos", true, S::ProfitLoss, K::Section, G::Revenue),
        def("expenses", "Expenses", "Gastos", false, S::ProfitLoss, K::Section, G::OperatingExpenses),
        def("gross_profit", "Gross Profit", "Utilidad Bruta", true, S::ProfitLoss, K::Total, G::Revenue),
        def("operating_profit", "Operating Profit", "Utilidad Operativa", true, S::ProfitLoss, K::Total, G::Revenue),
        def("net_income", "Net Income", "Utilidad Neta", true, S::ProfitLoss, K::Total, G::Revenue),
        // Balance sheet
        def("cash_and_equivalents", "Cash & Equivalents", "Efectivo y Equivalentes", true, S::BalanceSheet, K::Account, G::Assets),
        def("accounts_receivable", "Accounts Receivable", "Cuentas por Cobrar", true, S::BalanceSheet, K::Account, G::Assets),
        def("inventory", "Inventory", "Inventario", true, S::BalanceSheet, K::Account, G::Assets),
        def("prepaid_expenses", "Prepaid Expenses", "Gastos Anticipados", true, S::BalanceSheet, K::Account, G::Assets),
        def("fixed_assets", "Fixed Assets", "Activos Fijos", true, S::BalanceSheet, K::Account, G::Assets),
        def("accounts_payable", "Accounts Payable", "Cuentas por Pagar", false, S::BalanceSheet, K::Account, G::Liabilities),
        def("accrued_liabilities", "Accrued Liabilities", "Pasivos Devengados", false, S::BalanceSheet, K::Account, G::Liabilities),
        def("loans_payable", "Loans Payable", "Préstamos por Pagar", false, S::BalanceSheet, K::Account, G::Liabilities),
        def("share_capital", "Share Capital", "Capital Social", false, S::BalanceSheet, K::Account, G::Equity),
        def("retained_earnings", "Retained Earnings", "Resultados Acumulados", false, S::BalanceSheet, K::Account, G::Equity),
        def("assets", "Assets", "Activos", true, S::BalanceSheet, K::Section, G::Assets),
        def("liabilities", "Liabilities", "Pasivos", false, S::BalanceSheet, K::Section, G::Liabilities),
        def("equity", "Equity", "Patrimonio", false, S::BalanceSheet, K::Section, G::Equity),
        def("total_assets", "Total Assets", "Total Activos", true, S::BalanceSheet, K::Total, G::Assets),
        def("total_liabilities", "Total Liabilities", "Total Pasivos", false, S::BalanceSheet, K::Total, G::Liabilities),
        // Cash flow
        def("customer_collections", "Customer Collections", "Cobranzas a Clientes", true, S::CashFlow, K::Account, G::OperatingActivities),
        def("supplier_payments", "Supplier Payments", "Pagos a Proveedores", false, S::CashFlow, K::Account, G::OperatingActivities),
        def("payroll_payments", "Payroll Payments", "Pagos de Nómina", false, S::CashFlow, K::Account, G::OperatingActivities),
        def("tax_payments", "Tax Payments", "Pagos de Impuestos", false, S::CashFlow, K::Account, G::OperatingActivities),
        def("asset_purchases", "Asset Purchases", "Compras de Activos", false, S::CashFlow, K::Account, G::InvestingActivities),
        def("asset_sales", "Asset Sales", "Ventas de Activos", true, S::CashFlow, K::Account, G::InvestingActivities),
        def("loan_proceeds", "Loan Proceeds", "Desembolsos de Préstamos", true, S::CashFlow, K::Account, G::FinancingActivities),
        def("loan_repayments", "Loan Repayments", "Amortización de Préstamos", false, S::CashFlow, K::Account, G::FinancingActivities),
        def("dividends_paid", "Dividends Paid", "Dividendos Pagados", false, S::CashFlow, K::Account, G::FinancingActivities),
        def("operating_activities", "Operating Activities", "Actividades de Operación", true, S::CashFlow, K::Section, G::OperatingActivities),
        def("investing_activities", "Investing Activities", "Actividades de Inversión", false, S::CashFlow, K::Section, G::InvestingActivities),
        def("financing_activities", "Financing Activities", "Actividades de Financiamiento", false, S::CashFlow, K::Section, G::FinancingActivities),
        def("net_cash_flow", "Net Cash Flow", "Flujo Neto de Efectivo", true, S::CashFlow, K::Total, G::OperatingActivities),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(company: &str, key: &str) -> CustomCategory {
        CustomCategory {
            company_id: company.to_string(),
            key: key.to_string(),
            label_en: "Custom".to_string(),
            label_es: "Personalizada".to_string(),
            is_inflow: false,
            statement_type: StatementType::ProfitLoss,
            group: CategoryGroup::OperatingExpenses,
        }
    }

    #[test]
    fn test_builtin_catalog_loads_once_and_is_consistent() {
        let catalog = CategoryCatalog::builtin();
        assert!(std::ptr::eq(catalog, CategoryCatalog::builtin()));
        assert!(catalog.len() > 40);

        for definition in catalog.iter() {
            validate_key(&definition.key).unwrap();
            assert!(!definition.is_custom);
        }

        let sales = catalog.get("sales_revenue").unwrap();
        assert!(sales.is_inflow);
        assert_eq!(sales.statement_type, StatementType::ProfitLoss);

        let rent = catalog.get("rent_expense").unwrap();
        assert!(!rent.is_inflow);
    }

    #[test]
    fn test_key_format_validation() {
        assert!(validate_key("rent_expense").is_ok());
        assert!(validate_key("a2_b3").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("Rent").is_err());
        assert!(validate_key("2rent").is_err());
        assert!(validate_key("rent-expense").is_err());
    }

    #[test]
    fn test_custom_category_validation() {
        let existing = vec![custom("acme", "consulting_income")];

        assert!(validate_custom(&existing, &custom("acme", "software_licenses")).is_ok());
        // Same key, different tenant: fine.
        assert!(validate_custom(&existing, &custom("globex", "consulting_income")).is_ok());

        let err = validate_custom(&existing, &custom("acme", "consulting_income")).unwrap_err();
        assert!(matches!(
            err,
            ClassifierError::DuplicateCustomCategory { .. }
        ));

        let err = validate_custom(&existing, &custom("acme", "rent_expense")).unwrap_err();
        assert!(matches!(err, ClassifierError::BuiltinCategoryCollision(_)));

        let err = validate_custom(&existing, &custom("acme", "Bad Key")).unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidCategoryKey(_)));
    }

    #[test]
    fn test_with_custom_produces_merged_view() {
        let merged = CategoryCatalog::builtin()
            .with_custom(&[custom("acme", "consulting_income")])
            .unwrap();
        assert!(merged.contains("consulting_income"));
        assert!(merged.get("consulting_income").unwrap().is_custom);
        // Builtin catalog untouched.
        assert!(!CategoryCatalog::builtin().contains("consulting_income"));
    }

    #[test]
    fn test_for_statement_filters_by_type() {
        let catalog = CategoryCatalog::builtin();
        let pl = catalog.for_statement(StatementType::ProfitLoss);
        assert!(pl.iter().all(|d| d.statement_type == StatementType::ProfitLoss));
        assert!(pl.iter().any(|d| d.key == "sales_revenue"));
        assert!(!pl.iter().any(|d| d.key == "accounts_payable"));

        // Unknown context sees everything.
        assert_eq!(
            catalog.for_statement(StatementType::Unknown).len(),
            catalog.len()
        );
    }
}
