use std::collections::VecDeque;
use std::sync::Mutex;

use statement_classifier::*;

/// Completion stub that replays a fixed script of responses, one per
/// call, then reports itself exhausted.
struct ScriptedService {
    responses: Mutex<VecDeque<AiOutcome>>,
}

impl ScriptedService {
    fn new(responses: Vec<AiOutcome>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
        }
    }

    fn failing() -> Self {
        Self::new(Vec::new())
    }
}

impl CompletionService for ScriptedService {
    async fn complete(&self, _request: &CompletionRequest) -> AiOutcome {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AiFailure::Service("script exhausted".to_string())))
    }
}

fn text(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

/// A small bilingual profit-and-loss sheet with section headers, leaf
/// accounts and a trailing total row.
fn spanish_pl_table() -> RawTable {
    RawTable::new(vec![
        vec![text("Cuenta"), text("2024")],
        vec![text("Ingresos"), Cell::Empty],
        vec![text("Ventas"), Cell::Number(120_000.0)],
        vec![text("Ingresos por Servicios"), Cell::Number(30_000.0)],
        vec![text("Gastos"), Cell::Empty],
        vec![text("Sueldos y Salarios"), Cell::Number(-50_000.0)],
        vec![text("Alquiler"), text("(12,000)")],
        vec![text("Total Gastos"), Cell::Number(-62_000.0)],
    ])
}

const STRUCTURE_RESPONSE: &str = r#"{
    "statementType": "profit_loss",
    "confidence": 88,
    "headerRows": [0],
    "totalRows": [7],
    "subtotalRows": [],
    "dataStartRow": 1,
    "dataEndRow": 7,
    "accountColumns": {"nameColumn": 0, "confidence": 95},
    "periodColumns": [{"columnIndex": 1, "periodLabel": "2024", "periodType": "year", "confidence": 92}],
    "currency": "USD",
    "reasoning": "Header row followed by sectioned line items"
}"#;

const CLASSIFICATION_RESPONSE: &str = r#"[
    {"accountName":"Ingresos","rowIndex":1,"suggestedCategory":"revenue","isInflow":true,"confidence":80,"isSectionHeader":true},
    {"accountName":"Ventas","rowIndex":2,"suggestedCategory":"sales_revenue","isInflow":true,"confidence":95},
    {"accountName":"Ingresos por Servicios","rowIndex":3,"suggestedCategory":"service_revenue","isInflow":true,"confidence":90},
    {"accountName":"Gastos","rowIndex":4,"suggestedCategory":"expenses","isInflow":false,"confidence":80,"isSectionHeader":true},
    {"accountName":"Sueldos y Salarios","rowIndex":5,"suggestedCategory":"personnel_costs","isInflow":false,"confidence":88},
    {"accountName":"Alquiler","rowIndex":6,"suggestedCategory":"rent_expense","isInflow":false,"confidence":85}
]"#;

#[tokio::test]
async fn test_full_pipeline_with_separate_calls() {
    let service = ScriptedService::new(vec![
        Ok(STRUCTURE_RESPONSE.to_string()),
        Ok(CLASSIFICATION_RESPONSE.to_string()),
    ]);

    let output = StatementPipeline::new(&service)
        .process(&spanish_pl_table(), Some("resultados_2024.xlsx"))
        .await;

    assert_eq!(output.structure.statement_type, StatementType::ProfitLoss);
    assert_eq!(output.structure.confidence, 88);

    // The total row never reaches classification.
    assert_eq!(output.results.len(), 6);
    assert!(output
        .results
        .iter()
        .all(|r| !r.account_name.starts_with("Total")));

    let ventas = output.results.iter().find(|r| r.row_index == 2).unwrap();
    assert_eq!(ventas.suggested_category, "sales_revenue");
    assert!(ventas.is_inflow);
    assert_eq!(ventas.amount, Some(120_000.0));

    // Parenthesized text value parsed as a negative amount.
    let alquiler = output.results.iter().find(|r| r.row_index == 6).unwrap();
    assert_eq!(alquiler.amount, Some(-12_000.0));

    assert!(!output.validation.requires_manual_review);
    assert!(output.validation.confidence > 0.7);
}

#[tokio::test]
async fn test_pipeline_degrades_fully_without_a_service() {
    let service = ScriptedService::failing();

    let output = StatementPipeline::new(&service)
        .process(&spanish_pl_table(), None)
        .await;

    // Fallback structure, but still a complete classification set.
    assert_eq!(output.structure.confidence, 30);
    assert_eq!(output.structure.statement_type, StatementType::Unknown);
    assert_eq!(output.results.len(), 6);

    let sueldos = output.results.iter().find(|r| r.row_index == 5).unwrap();
    assert_eq!(sueldos.suggested_category, "personnel_costs");
    assert!(!sueldos.is_inflow);
    assert!(sueldos.confidence >= 70);

    let alquiler = output.results.iter().find(|r| r.row_index == 6).unwrap();
    assert_eq!(alquiler.suggested_category, "rent_expense");

    // Bare section terms get promoted to headers by validation.
    let gastos = output.results.iter().find(|r| r.row_index == 4).unwrap();
    assert!(gastos.is_section_header);

    assert!(!output.validation.requires_manual_review);
}

#[tokio::test]
async fn test_combined_analysis_single_call() {
    let combined = format!(
        r#"{{"structure": {}, "classifications": {}}}"#,
        STRUCTURE_RESPONSE, CLASSIFICATION_RESPONSE
    );
    let service = ScriptedService::new(vec![Ok(combined)]);

    let output = StatementPipeline::new(&service)
        .with_options(ClassifierOptions {
            combined_analysis: true,
            ..ClassifierOptions::default()
        })
        .process(&spanish_pl_table(), None)
        .await;

    assert_eq!(output.structure.statement_type, StatementType::ProfitLoss);
    assert_eq!(output.results.len(), 6);
    // Exactly one call was consumed: the script holds nothing else and
    // the output is not the degraded one.
    assert_eq!(output.structure.confidence, 88);
}

#[tokio::test]
async fn test_combined_analysis_falls_back_to_separate_calls() {
    let service = ScriptedService::new(vec![
        Ok("definitely not json".to_string()),
        Ok(STRUCTURE_RESPONSE.to_string()),
        Ok(CLASSIFICATION_RESPONSE.to_string()),
    ]);

    let output = StatementPipeline::new(&service)
        .with_options(ClassifierOptions {
            combined_analysis: true,
            ..ClassifierOptions::default()
        })
        .process(&spanish_pl_table(), None)
        .await;

    assert_eq!(output.structure.statement_type, StatementType::ProfitLoss);
    assert_eq!(output.structure.confidence, 88);
    assert_eq!(output.results.len(), 6);
    assert!(!output.validation.requires_manual_review);
}

#[tokio::test]
async fn test_tenant_catalog_accepts_custom_categories() {
    let merged = CategoryCatalog::builtin()
        .with_custom(&[CustomCategory {
            company_id: "acme".to_string(),
            key: "consulting_income".to_string(),
            label_en: "Consulting Income".to_string(),
            label_es: "Ingresos por Consultoría".to_string(),
            is_inflow: true,
            statement_type: StatementType::ProfitLoss,
            group: CategoryGroup::Revenue,
        }])
        .unwrap();

    let table = RawTable::new(vec![
        vec![text("Account"), text("2024")],
        vec![text("Consulting"), Cell::Number(40_000.0)],
    ]);
    let structure = r#"{
        "statementType": "profit_loss", "confidence": 90,
        "headerRows": [0], "dataStartRow": 1, "dataEndRow": 1,
        "accountColumns": {"nameColumn": 0, "confidence": 95},
        "periodColumns": [{"columnIndex": 1, "periodLabel": "2024", "periodType": "year", "confidence": 90}],
        "currency": "USD"
    }"#;
    let classification = r#"[
        {"accountName":"Consulting","rowIndex":1,"suggestedCategory":"consulting_income","isInflow":true,"confidence":91}
    ]"#;
    let service = ScriptedService::new(vec![
        Ok(structure.to_string()),
        Ok(classification.to_string()),
    ]);

    let output = StatementPipeline::new(&service)
        .with_catalog(&merged)
        .process(&table, None)
        .await;

    // The custom key survives the enhancement pass because the merged
    // catalog knows it.
    assert_eq!(output.results[0].suggested_category, "consulting_income");
}

#[test]
fn test_offline_path_needs_no_service_at_all() {
    let output = process_offline(&spanish_pl_table(), None);

    assert_eq!(output.structure.confidence, 30);
    assert_eq!(output.results.len(), 6);
    assert!(output.results.iter().all(|r| r.confidence <= 100));

    let ventas = output.results.iter().find(|r| r.row_index == 2).unwrap();
    assert_eq!(ventas.suggested_category, "sales_revenue");
    assert!(ventas.is_inflow);
}
