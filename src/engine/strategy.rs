// ==========================================
// 人事薪资后台 - 记录类型策略
// ==========================================
// 职责: 每种记录类型的 表头规则 / 行校验 / 类型化映射 / 目标期间
// 用途: 导入状态机只依赖此 Trait，不按记录类型复制流程
// ==========================================

use crate::domain::employee::EmployeeRecord;
use crate::domain::overtime::OvertimeRecord;
use crate::domain::payroll::PayrollRecord;
use crate::domain::session::{ParsedRow, RowError, TargetPeriod};
use crate::domain::types::{OvertimeCode, RecordKind};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{preview_row, FieldMapper};
use crate::importer::file_parser::Workbook;
use crate::importer::overtime_transformer::OvertimeTransformer;
use crate::importer::schema_validator::SchemaValidator;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::debug;

// ==========================================
// PreparedBatch - 待提交批次
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedBatch {
    Employees(Vec<EmployeeRecord>),
    Payroll {
        competence: NaiveDate,
        rows: Vec<PayrollRecord>,
    },
    Overtime {
        dates: BTreeSet<NaiveDate>,
        rows: Vec<OvertimeRecord>,
    },
}

impl PreparedBatch {
    pub fn kind(&self) -> RecordKind {
        match self {
            PreparedBatch::Employees(_) => RecordKind::EmployeeRoster,
            PreparedBatch::Payroll { .. } => RecordKind::PayrollClosure,
            PreparedBatch::Overtime { .. } => RecordKind::OvertimeReport,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PreparedBatch::Employees(rows) => rows.len(),
            PreparedBatch::Payroll { rows, .. } => rows.len(),
            PreparedBatch::Overtime { rows, .. } => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 目标期间（花名册无期间）
    pub fn target_period(&self) -> Option<TargetPeriod> {
        match self {
            PreparedBatch::Employees(_) => None,
            PreparedBatch::Payroll { competence, .. } => Some(TargetPeriod::Month(*competence)),
            PreparedBatch::Overtime { dates, .. } => Some(TargetPeriod::Dates(dates.clone())),
        }
    }

    /// 批次引用的登记号
    pub fn registrations(&self) -> Vec<i64> {
        match self {
            PreparedBatch::Employees(rows) => rows.iter().map(|r| r.registration).collect(),
            PreparedBatch::Payroll { rows, .. } => rows.iter().map(|r| r.registration).collect(),
            PreparedBatch::Overtime { rows, .. } => rows.iter().map(|r| r.registration).collect(),
        }
    }
}

/// 校验结果
#[derive(Debug, Clone)]
pub struct Validated {
    pub columns: Vec<String>,
    pub rows: Vec<ParsedRow>,
    pub row_errors: Vec<RowError>,
    /// 阻断型行错误存在时为 None
    pub batch: Option<PreparedBatch>,
}

// ==========================================
// RecordTypeStrategy Trait
// ==========================================
pub trait RecordTypeStrategy: Send + Sync {
    fn kind(&self) -> RecordKind;

    /// 表头校验 + 行校验 + 映射
    ///
    /// # 返回
    /// - Err(MissingHeaders): 表头缺失（不做任何行处理）
    /// - Err(MultipleCompetences / NoActionableRows): 批次级错误
    /// - Ok(Validated): 行错误随结果返回，由调用方按记录类型决定是否阻断
    fn prepare(&self, workbook: &Workbook) -> ImportResult<Validated>;
}

// ===== 员工花名册 =====
pub struct EmployeeStrategy;

impl RecordTypeStrategy for EmployeeStrategy {
    fn kind(&self) -> RecordKind {
        RecordKind::EmployeeRoster
    }

    fn prepare(&self, workbook: &Workbook) -> ImportResult<Validated> {
        let check = SchemaValidator.check_headers(self.kind(), &workbook.headers);
        if !check.is_ok() {
            return Err(ImportError::MissingHeaders(check.missing));
        }

        // 行错误仅提示，行照常映射（缺失值置空）
        let row_errors = SchemaValidator.validate_rows(self.kind(), &check.columns, &workbook.rows);
        let mapper = FieldMapper::new(&check.columns);
        let records: Vec<EmployeeRecord> = workbook
            .rows
            .iter()
            .filter_map(|row| mapper.map_employee(row))
            .collect();

        debug!(rows = workbook.rows.len(), mapped = records.len(), errors = row_errors.len(), "花名册校验完成");
        Ok(Validated {
            columns: check.columns.canonical_columns(),
            rows: records.iter().map(preview_row).collect(),
            row_errors,
            batch: Some(PreparedBatch::Employees(records)),
        })
    }
}

// ===== 薪资结算 =====
pub struct PayrollStrategy;

impl RecordTypeStrategy for PayrollStrategy {
    fn kind(&self) -> RecordKind {
        RecordKind::PayrollClosure
    }

    fn prepare(&self, workbook: &Workbook) -> ImportResult<Validated> {
        let check = SchemaValidator.check_headers(self.kind(), &workbook.headers);
        if !check.is_ok() {
            return Err(ImportError::MissingHeaders(check.missing));
        }

        let columns = check.columns.canonical_columns();
        let row_errors = SchemaValidator.validate_rows(self.kind(), &check.columns, &workbook.rows);
        let mapper = FieldMapper::new(&check.columns);
        let records: Vec<PayrollRecord> = workbook
            .rows
            .iter()
            .filter_map(|row| mapper.map_payroll(row))
            .collect();
        let rows = records.iter().map(preview_row).collect();

        if !row_errors.is_empty() {
            return Ok(Validated {
                columns,
                rows,
                row_errors,
                batch: None,
            });
        }

        // 一个批次只能对应一个竞争月份
        let competences: BTreeSet<NaiveDate> = records.iter().map(|r| r.competence).collect();
        let competence = match competences.len() {
            0 => return Err(ImportError::NoActionableRows),
            1 => competences.into_iter().next().ok_or(ImportError::NoActionableRows)?,
            _ => {
                return Err(ImportError::MultipleCompetences(
                    competences
                        .iter()
                        .map(|c| c.format("%m/%Y").to_string())
                        .collect(),
                ))
            }
        };

        Ok(Validated {
            columns,
            rows,
            row_errors,
            batch: Some(PreparedBatch::Payroll {
                competence,
                rows: records,
            }),
        })
    }
}

// ===== 加班报表 =====
pub struct OvertimeStrategy {
    transformer: OvertimeTransformer,
}

impl OvertimeStrategy {
    pub fn new(transformer: OvertimeTransformer) -> Self {
        Self { transformer }
    }
}

impl RecordTypeStrategy for OvertimeStrategy {
    fn kind(&self) -> RecordKind {
        RecordKind::OvertimeReport
    }

    fn prepare(&self, workbook: &Workbook) -> ImportResult<Validated> {
        let sheet = self.transformer.transform(workbook);
        if sheet.rows.is_empty() {
            return Err(ImportError::NoActionableRows);
        }

        let mut columns = vec![
            "registration".to_string(),
            "name".to_string(),
            "date".to_string(),
        ];
        columns.extend(OvertimeCode::ALL.iter().map(|c| c.as_str().to_string()));

        let row_errors = SchemaValidator.validate_overtime_rows(&sheet.rows);
        let rows = sheet.rows.iter().map(|r| r.preview()).collect();
        if !row_errors.is_empty() {
            return Ok(Validated {
                columns,
                rows,
                row_errors,
                batch: None,
            });
        }

        let records: Vec<OvertimeRecord> =
            sheet.rows.iter().filter_map(|r| r.to_record()).collect();
        let dates = records.iter().map(|r| r.date).collect();

        debug!(layout = ?sheet.layout, period = %sheet.period_label(), rows = records.len(), "加班报表校验完成");
        Ok(Validated {
            columns,
            rows,
            row_errors,
            batch: Some(PreparedBatch::Overtime {
                dates,
                rows: records,
            }),
        })
    }
}

/// 记录类型 → 策略
pub fn strategy_for(
    kind: RecordKind,
    registration_threshold: i64,
    reference_cell: &str,
) -> Box<dyn RecordTypeStrategy> {
    match kind {
        RecordKind::EmployeeRoster => Box::new(EmployeeStrategy),
        RecordKind::PayrollClosure => Box::new(PayrollStrategy),
        RecordKind::OvertimeReport => Box::new(OvertimeStrategy::new(OvertimeTransformer::new(
            registration_threshold,
            reference_cell,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::file_parser::CellValue;

    fn grid(rows: &[&[&str]]) -> Workbook {
        Workbook::from_grid(
            rows.iter()
                .map(|r| r.iter().map(|c| CellValue::from_text(c)).collect())
                .collect(),
        )
    }

    #[test]
    fn test_payroll_rejects_multiple_competences() {
        let workbook = grid(&[
            &["Cadastro", "Nome", "Evento", "Referência", "Valor", "Competência"],
            &["100200", "Ana", "001", "30", "1.000,00", "01/03/2025"],
            &["100300", "Bia", "001", "30", "900,00", "01/04/2025"],
        ]);
        let result = PayrollStrategy.prepare(&workbook);
        match result {
            Err(ImportError::MultipleCompetences(list)) => {
                assert_eq!(list, vec!["03/2025", "04/2025"])
            }
            other => panic!("unexpected: {:?}", other.map(|v| v.rows.len())),
        }
    }

    #[test]
    fn test_payroll_row_errors_block_batch() {
        let workbook = grid(&[
            &["Cadastro", "Nome", "Evento", "Referência", "Valor", "Competência"],
            &["100200", "Ana", "001", "30", "", "01/03/2025"],
        ]);
        let validated = PayrollStrategy.prepare(&workbook).unwrap();
        assert_eq!(validated.row_errors.len(), 1);
        assert!(validated.batch.is_none());
    }

    #[test]
    fn test_employee_row_errors_are_advisory() {
        let workbook = grid(&[
            &["Empresa", "Cadastro", "Nome", "CPF", "Nascimento", "Admissão", "Situação"],
            &["1", "100200", "Ana", "", "15/08/1990", "01/03/2020", "1"],
            &["1", "", "Sem Cadastro", "123", "15/08/1990", "01/03/2020", "1"],
        ]);
        let validated = EmployeeStrategy.prepare(&workbook).unwrap();
        assert_eq!(validated.row_errors.len(), 2);
        match validated.batch {
            Some(PreparedBatch::Employees(records)) => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].cpf, None);
            }
            other => panic!("unexpected batch: {:?}", other),
        }
    }

    #[test]
    fn test_missing_headers_stop_processing() {
        let workbook = grid(&[&["Nome", "Valor"], &["Ana", "10"]]);
        assert!(matches!(
            PayrollStrategy.prepare(&workbook),
            Err(ImportError::MissingHeaders(_))
        ));
    }
}
