//! Bilingual keyword dictionaries keyed by taxonomy category. The local
//! fallback classifier scores against both languages at once (uploads
//! rarely declare their language); the context mapper picks one locale.

use crate::taxonomy::Locale;

pub(crate) struct CategoryKeywords {
    pub category: &'static str,
    pub en: &'static [&'static str],
    pub es: &'static [&'static str],
    /// Any hit here zeroes the category for the current name.
    pub exclusions: &'static [&'static str],
}

impl CategoryKeywords {
    pub fn for_locale(&self, locale: Locale) -> &'static [&'static str] {
        match locale {
            Locale::En => self.en,
            Locale::Es => self.es,
        }
    }
}

macro_rules! kw {
    ($category:literal, $en:expr, $es:expr) => {
        kw!($category, $en, $es, &[])
    };
    ($category:literal, $en:expr, $es:expr, $excl:expr) => {
        CategoryKeywords {
            category: $category,
            en: $en,
            es: $es,
            exclusions: $excl,
        }
    };
}

pub(crate) const CATEGORY_KEYWORDS: &[CategoryKeywords] = &[
    // Profit and loss: revenue
    kw!(
        "sales_revenue",
        &["sales", "revenue", "turnover", "product sales"],
        &["ventas", "ingresos por ventas", "facturación", "facturacion"],
        &["cost", "costo", "return", "devolución", "devolucion"]
    ),
    kw!(
        "service_revenue",
        &["service", "services", "consulting revenue", "fees earned"],
        &["servicios", "ingresos por servicios", "asesorías", "asesorias"],
        &["cost", "costo", "expense", "gasto"]
    ),
    kw!(
        "interest_income",
        &["interest income", "interest earned", "investment income"],
        &["ingresos financieros", "intereses ganados"],
        &["expense", "paid", "gasto", "pagado"]
    ),
    kw!(
        "other_income",
        &["other income"],
        &["otros ingresos"]
    ),
    // Profit and loss: costs
    kw!(
        "cost_of_sales",
        &["cost of sales", "cost of goods", "cogs", "direct costs"],
        &["costo de ventas", "costo de mercadería", "costo de mercaderia", "costos directos"]
    ),
    kw!(
        "materials_cost",
        &["materials", "raw materials"],
        &["materiales", "materia prima"]
    ),
    kw!(
        "personnel_costs",
        &["salary", "salaries", "wages", "payroll", "staff costs", "employee benefits"],
        &["sueldo", "sueldos", "salario", "salarios", "nómina", "nomina", "remuneraciones", "cargas sociales"]
    ),
    kw!(
        "rent_expense",
        &["rent", "lease"],
        &["alquiler", "renta", "arrendamiento"]
    ),
    kw!(
        "utilities_expense",
        &["utilities", "electricity", "water", "internet", "telephone"],
        &["servicios públicos", "servicios publicos", "luz", "agua", "electricidad", "teléfono", "telefono"]
    ),
    kw!(
        "marketing_expense",
        &["marketing", "advertising", "promotion"],
        &["publicidad", "mercadeo", "promoción", "promocion"]
    ),
    kw!(
        "insurance_expense",
        &["insurance"],
        &["seguro", "seguros"]
    ),
    kw!(
        "office_supplies",
        &["office supplies", "stationery"],
        &["útiles de oficina", "utiles de oficina", "papelería", "papeleria"]
    ),
    kw!(
        "professional_fees",
        &["professional fees", "legal fees", "accounting fees", "consultant"],
        &["honorarios", "asesoría legal", "asesoria legal"]
    ),
    kw!(
        "travel_expense",
        &["travel", "lodging", "mileage"],
        &["viáticos", "viaticos", "viajes"]
    ),
    kw!(
        "depreciation_amortization",
        &["depreciation", "amortization", "amortisation"],
        &["depreciación", "depreciacion", "amortización", "amortizacion"]
    ),
    kw!(
        "interest_expense",
        &["interest expense", "interest paid", "finance charges", "bank charges"],
        &["gastos financieros", "intereses pagados", "comisiones bancarias"],
        &["income", "earned", "ingreso", "ganado"]
    ),
    kw!(
        "tax_expense",
        &["income tax", "tax expense", "taxes", "vat"],
        &["impuesto", "impuestos", "iva", "tributos"],
        &["refund", "devolución", "devolucion"]
    ),
    // Balance sheet
    kw!(
        "cash_and_equivalents",
        &["cash", "bank account", "petty cash"],
        &["efectivo", "caja", "banco", "bancos"]
    ),
    kw!(
        "accounts_receivable",
        &["receivable", "receivables", "debtors"],
        &["cuentas por cobrar", "clientes", "deudores"]
    ),
    kw!(
        "inventory",
        &["inventory", "stock on hand"],
        &["inventario", "existencias", "mercadería", "mercaderia"]
    ),
    kw!(
        "prepaid_expenses",
        &["prepaid"],
        &["anticipados", "pagos anticipados"]
    ),
    kw!(
        "fixed_assets",
        &["equipment", "machinery", "property", "vehicles", "furniture", "fixed asset"],
        &["activo fijo", "activos fijos", "maquinaria", "equipos", "vehículos", "vehiculos", "inmuebles"]
    ),
    kw!(
        "accounts_payable",
        &["payable", "payables", "creditors"],
        &["cuentas por pagar", "proveedores", "acreedores"]
    ),
    kw!(
        "accrued_liabilities",
        &["accrued"],
        &["devengados", "provisiones"]
    ),
    kw!(
        "loans_payable",
        &["loan", "borrowing", "mortgage", "note payable"],
        &["préstamo", "prestamo", "préstamos", "prestamos", "hipoteca"]
    ),
    kw!(
        "share_capital",
        &["share capital", "common stock", "capital stock"],
        &["capital social"]
    ),
    kw!(
        "retained_earnings",
        &["retained earnings"],
        &["resultados acumulados", "utilidades retenidas"]
    ),
    // Cash flow
    kw!(
        "customer_collections",
        &["collections", "receipts from customers", "cash received"],
        &["cobranzas", "cobros", "recaudación", "recaudacion"]
    ),
    kw!(
        "supplier_payments",
        &["payments to suppliers", "supplier payments"],
        &["pagos a proveedores"]
    ),
    kw!(
        "payroll_payments",
        &["payroll payments", "wages paid"],
        &["pagos de nómina", "pagos de nomina"]
    ),
    kw!(
        "tax_payments",
        &["tax payments", "taxes paid"],
        &["pagos de impuestos"]
    ),
    kw!(
        "asset_purchases",
        &["purchase of equipment", "capital expenditure", "capex"],
        &["compra de activos"]
    ),
    kw!(
        "asset_sales",
        &["sale of equipment", "proceeds from sale"],
        &["venta de activos"]
    ),
    kw!(
        "loan_proceeds",
        &["loan proceeds", "borrowings received"],
        &["desembolso de préstamo", "desembolso de prestamo"]
    ),
    kw!(
        "loan_repayments",
        &["loan repayment", "principal payment"],
        &["amortización de préstamo", "amortizacion de prestamo"]
    ),
    kw!(
        "dividends_paid",
        &["dividends"],
        &["dividendos"]
    ),
];

/// Vocabulary that marks a name as *some* kind of expense even when no
/// category-specific keyword fires.
pub(crate) const GENERIC_EXPENSE_TERMS: &[&str] = &[
    "expense", "expenses", "cost", "costs", "fee", "fees", "charge", "gasto", "gastos", "costo",
    "costos", "pago",
];
