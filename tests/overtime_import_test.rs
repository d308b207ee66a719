// ==========================================
// 加班报表集成测试
// ==========================================
// 测试目标: 非结构化矩阵扫描、结构化透传、登记号交叉校验、按日期冲突
// ==========================================

mod test_helpers;

use chrono::NaiveDate;
use hr_import::engine::UploadOutcome;
use hr_import::importer::error::ImportError;
use hr_import::importer::overtime_transformer::{OvertimeLayout, OvertimeTransformer};
use hr_import::repository::{RecordStore, SelectQuery};
use hr_import::{ImportStatus, OvertimeCode, RecordKind};
use serde_json::json;
use test_helpers::{create_test_context, obj, workbook_from_text};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

const UNSTRUCTURED_CSV: &str = "Relatório de Horas Extras;;;\n\
    Período:;10/03/2025;;\n\
    Cadastro;Nome;Código;Horas\n\
    100200;Ana Souza;;\n\
    ;303;Hora extra 50%;01:00\n\
    ;303;Hora extra 50%;00:30\n\
    ;505;Adicional noturno;00:45\n\
    100100;Bruno Lima;;\n\
    ;512;01:15;\n";

#[test]
fn test_unstructured_block_accumulates_per_code() {
    let workbook = workbook_from_text(&[
        &["Relatório de Horas Extras", "", "", ""],
        &["Período:", "10/03/2025", "", ""],
        &["Cadastro", "Nome", "Código", "Horas"],
        &["100200", "Ana Souza", "", ""],
        &["", "303", "Hora extra 50%", "01:00"],
        &["", "303", "Hora extra 50%", "00:30"],
        &["", "505", "Adicional noturno", "00:45"],
    ]);

    let sheet = OvertimeTransformer::default().transform(&workbook);
    assert_eq!(sheet.layout, OvertimeLayout::Unstructured);
    assert_eq!(sheet.period, Some(ymd(2025, 3, 10)));
    assert_eq!(sheet.rows.len(), 1);

    let preview = sheet.rows[0].preview();
    assert_eq!(preview["registration"], "100200");
    assert_eq!(preview["name"], "Ana Souza");
    assert_eq!(preview["303"], "01:30");
    assert_eq!(preview["505"], "00:45");
    for code in ["304", "506", "511", "512"] {
        assert_eq!(preview[code], "", "code {}", code);
    }
}

#[test]
fn test_unstructured_rows_sorted_by_registration() {
    let workbook = workbook_from_text(&[
        &["Relatório", ""],
        &["", ""],
        &["300300", "Zeca"],
        &["511", "02:00"],
        &["100100", "Bruno"],
        &["511", "00:10"],
    ]);
    let sheet = OvertimeTransformer::default().transform(&workbook);
    let registrations: Vec<_> = sheet.rows.iter().map(|r| r.registration).collect();
    assert_eq!(registrations, vec![Some(100100), Some(300300)]);
    assert_eq!(sheet.rows[1].buckets.get(OvertimeCode::C511), 120);
    assert_eq!(sheet.period, None);
}

#[test]
fn test_registration_threshold_is_configurable() {
    let workbook = workbook_from_text(&[
        &["Relatório", ""],
        &["4521", "Carla"],
        &["303", "00:20"],
    ]);
    assert!(OvertimeTransformer::default().transform(&workbook).rows.is_empty());

    let sheet = OvertimeTransformer::new(1000, "B2").transform(&workbook);
    assert_eq!(sheet.rows.len(), 1);
    assert_eq!(sheet.rows[0].buckets.get(OvertimeCode::C303), 20);
}

#[test]
fn test_empty_workbook_yields_nothing() {
    let sheet = OvertimeTransformer::default().transform(&workbook_from_text(&[]));
    assert!(sheet.rows.is_empty());
    assert_eq!(sheet.period_label(), "");
}

#[tokio::test]
async fn test_unstructured_report_import_end_to_end() {
    let mut ctx = create_test_context(&[100100, 100200]).await;
    ctx.pipeline
        .select_file(RecordKind::OvertimeReport, "horas.csv", UNSTRUCTURED_CSV.as_bytes())
        .await
        .unwrap();
    assert_eq!(ctx.pipeline.session().rows.len(), 2);

    match ctx.pipeline.upload().await.unwrap() {
        UploadOutcome::Committed(summary) => assert_eq!(summary.inserts, 2),
        other => panic!("unexpected: {:?}", other),
    }

    let rows = ctx
        .store
        .select("overtime", &SelectQuery::all().order_by("registration", false))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["registration"], json!(100100));
    assert_eq!(rows[0]["512"], json!(75));
    assert_eq!(rows[1]["303"], json!(90));
    assert_eq!(rows[1]["date"], json!("2025-03-10"));

    let history = ctx.pipeline.history().entries().await;
    assert_eq!(history[0].table_label, "overtime Ref. 10/03/2025");
}

#[tokio::test]
async fn test_overtime_unknown_registration_blocks_whole_batch() {
    let mut ctx = create_test_context(&[100200]).await;
    ctx.pipeline
        .select_file(RecordKind::OvertimeReport, "horas.csv", UNSTRUCTURED_CSV.as_bytes())
        .await
        .unwrap();

    let err = ctx.pipeline.upload().await.unwrap_err();
    match err {
        ImportError::UnknownRegistrations(list) => assert_eq!(list, vec![100100]),
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(ctx.pipeline.session().status, ImportStatus::Error);
    assert!(ctx
        .store
        .select("overtime", &SelectQuery::all())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_structured_sheet_conflicts_on_any_existing_date() {
    let mut ctx = create_test_context(&[100200]).await;
    ctx.store
        .insert(
            "overtime",
            vec![obj(json!({"registration": 100200, "date": "2025-03-11"}))],
        )
        .await
        .unwrap();

    let csv = "Data;Cadastro;Nome;303;304;505;506;511;512\n\
        10/03/2025;100200;Ana;1:30;;0,5;;;\n\
        11/03/2025;100200;Ana;;;;;;2\n";
    ctx.pipeline
        .select_file(RecordKind::OvertimeReport, "estruturado.csv", csv.as_bytes())
        .await
        .unwrap();
    let session = ctx.pipeline.session();
    assert_eq!(session.rows[0]["303"], "01:30");
    assert_eq!(session.rows[0]["505"], "00:30");
    assert_eq!(session.rows[1]["512"], "02:00");

    match ctx.pipeline.upload().await.unwrap() {
        UploadOutcome::ConflictPending(conflict) => {
            assert_eq!(conflict.period_ref, "10/03/2025, 11/03/2025");
            assert_eq!(conflict.period_key, "2025-03-10,2025-03-11");
        }
        other => panic!("unexpected: {:?}", other),
    }
}
