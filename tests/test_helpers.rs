// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 内存存储、固定用户、导入状态机与样例表格
// ==========================================

#![allow(dead_code)]

use hr_import::app::{CollectingNotificationSink, SessionUser, StaticSessionStore};
use hr_import::config::ImportSettings;
use hr_import::engine::{HistoryLog, ImportPipeline, ReconciliationEngine};
use hr_import::importer::file_parser::{CellValue, Workbook};
use hr_import::repository::{RecordStore, Row, SqliteRecordStore};
use serde_json::{json, Value};
use std::sync::Arc;

pub const OPERATOR_PASSWORD: &str = "segredo";

/// 测试上下文（存储 / 通知 / 状态机）
pub struct TestContext {
    pub store: Arc<SqliteRecordStore>,
    pub notifier: Arc<CollectingNotificationSink>,
    pub pipeline: ImportPipeline,
}

pub fn operator() -> SessionUser {
    SessionUser::new("u1", "Operador", OPERATOR_PASSWORD, "import,delete")
}

pub fn obj(v: Value) -> Row {
    match v {
        Value::Object(map) => map,
        _ => panic!("expected JSON object"),
    }
}

/// 创建内存存储并预置员工登记号
pub async fn create_test_context(registrations: &[i64]) -> TestContext {
    create_test_context_with(registrations, ImportSettings::default()).await
}

pub async fn create_test_context_with(
    registrations: &[i64],
    settings: ImportSettings,
) -> TestContext {
    let store = Arc::new(SqliteRecordStore::open_in_memory().expect("open in-memory store"));
    seed_employees(&store, registrations).await;

    let dyn_store: Arc<dyn RecordStore> = store.clone();
    let notifier = Arc::new(CollectingNotificationSink::new());
    let pipeline = ImportPipeline::new(
        Arc::clone(&dyn_store),
        Arc::new(StaticSessionStore::new(operator())),
        notifier.clone(),
        settings.clone(),
        Arc::new(ReconciliationEngine::new(
            Arc::clone(&dyn_store),
            settings.registration_page_size,
        )),
        Arc::new(HistoryLog::new(dyn_store, settings.history_field_max_len)),
    );

    TestContext {
        store,
        notifier,
        pipeline,
    }
}

pub async fn seed_employees(store: &SqliteRecordStore, registrations: &[i64]) {
    if registrations.is_empty() {
        return;
    }
    let rows = registrations
        .iter()
        .map(|r| obj(json!({"registration": r, "name": format!("Funcionario {}", r)})))
        .collect();
    store.insert("employees", rows).await.expect("seed employees");
}

/// 文本网格 → Workbook（空串为空单元格）
pub fn workbook_from_text(rows: &[&[&str]]) -> Workbook {
    Workbook::from_grid(
        rows.iter()
            .map(|r| r.iter().map(|c| CellValue::from_text(c)).collect())
            .collect(),
    )
}

/// 薪资 CSV（分号分隔，巴西格式）
pub fn payroll_csv(competence: &str, rows: &[(i64, &str, &str)]) -> String {
    let mut csv = String::from("Cadastro;Nome;Evento;Referência;Valor;Competência\n");
    for (registration, name, value) in rows {
        csv.push_str(&format!(
            "{};{};001;30;{};{}\n",
            registration, name, value, competence
        ));
    }
    csv
}
