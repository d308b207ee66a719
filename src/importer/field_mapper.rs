// ==========================================
// 人事薪资后台 - 字段映射器实现
// ==========================================
// 职责: 键控原始行 → 类型化记录（业务逻辑不再接触原始表头）
// ==========================================

use crate::domain::employee::EmployeeRecord;
use crate::domain::payroll::{month_start, PayrollRecord};
use crate::domain::session::ParsedRow;
use crate::importer::cell_normalizer::{
    normalize_cpf, normalize_date, normalize_decimal, normalize_integer, normalize_text,
};
use crate::importer::file_parser::RawRow;
use crate::importer::schema_validator::ColumnMap;
use serde::Serialize;

pub struct FieldMapper<'a> {
    columns: &'a ColumnMap,
}

impl<'a> FieldMapper<'a> {
    pub fn new(columns: &'a ColumnMap) -> Self {
        Self { columns }
    }

    fn text(&self, row: &RawRow, field: &str) -> Option<String> {
        normalize_text(self.columns.value(row, field))
    }

    fn integer(&self, row: &RawRow, field: &str) -> Option<i64> {
        normalize_integer(self.columns.value(row, field))
    }

    /// 员工行映射（无登记号时返回 None，其余字段宽松取值）
    pub fn map_employee(&self, row: &RawRow) -> Option<EmployeeRecord> {
        let registration = self.integer(row, "registration")?;

        let mut record = EmployeeRecord::new(
            registration,
            self.text(row, "name").unwrap_or_default(),
        );
        record.company_id = self.integer(row, "company_id");
        record.cpf = normalize_cpf(self.columns.value(row, "cpf"));
        record.birth_date = normalize_date(self.columns.value(row, "birth_date"));
        record.hire_date = normalize_date(self.columns.value(row, "hire_date"));
        record.status_date = normalize_date(self.columns.value(row, "status_date"));
        record.status_code = self
            .integer(row, "status_code")
            .and_then(|c| i32::try_from(c).ok());
        record.role = self.text(row, "role");
        record.sector = self.text(row, "sector");
        record.nationality = self.text(row, "nationality");
        record.education = self.text(row, "education");
        record.sex = self.text(row, "sex");
        record.marital_status = self.text(row, "marital_status");
        record.ethnicity = self.text(row, "ethnicity");
        record.salary = normalize_decimal(self.columns.value(row, "salary"));
        Some(record)
    }

    /// 薪资行映射（行校验通过后调用；competence 归一到月初）
    pub fn map_payroll(&self, row: &RawRow) -> Option<PayrollRecord> {
        Some(PayrollRecord {
            registration: self.integer(row, "registration")?,
            name: self.text(row, "name")?,
            event_code: self.text(row, "event_code")?,
            reference: normalize_decimal(self.columns.value(row, "reference")),
            value: normalize_decimal(self.columns.value(row, "value"))?,
            competence: month_start(normalize_date(self.columns.value(row, "competence"))?),
        })
    }
}

/// 记录 → 预览行（字段名 → 展示文本，空值为空串）
pub fn preview_row<T: Serialize>(record: &T) -> ParsedRow {
    let mut row = ParsedRow::new();
    if let Ok(serde_json::Value::Object(map)) = serde_json::to_value(record) {
        for (key, value) in map {
            let text = match value {
                serde_json::Value::Null => String::new(),
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            row.insert(key, text);
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::RecordKind;
    use crate::importer::file_parser::CellValue;
    use crate::importer::schema_validator::SchemaValidator;
    use chrono::NaiveDate;

    #[test]
    fn test_map_employee_normalizes_cells() {
        let headers: Vec<String> = ["Empresa", "Cadastro", "Nome", "CPF", "Nascimento", "Admissão", "Situação", "Salário"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let check = SchemaValidator.check_headers(RecordKind::EmployeeRoster, &headers);
        let row: RawRow = [
            ("Empresa", CellValue::Number(1.0)),
            ("Cadastro", CellValue::from_text("100200")),
            ("Nome", CellValue::from_text(" Ana Souza ")),
            ("CPF", CellValue::from_text("1234567890")),
            ("Nascimento", CellValue::from_text("15/08/1990")),
            ("Admissão", CellValue::Number(45717.0)),
            ("Situação", CellValue::Number(1.0)),
            ("Salário", CellValue::from_text("3.500,00")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let record = FieldMapper::new(&check.columns).map_employee(&row).unwrap();
        assert_eq!(record.registration, 100200);
        assert_eq!(record.name, "Ana Souza");
        assert_eq!(record.cpf.as_deref(), Some("012.345.678-90"));
        assert_eq!(record.birth_date, NaiveDate::from_ymd_opt(1990, 8, 15));
        assert_eq!(record.hire_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(record.salary, Some(3500.0));

        let preview = preview_row(&record);
        assert_eq!(preview["registration"], "100200");
        assert_eq!(preview["sector"], "");
    }

    #[test]
    fn test_map_payroll_month_start() {
        let headers: Vec<String> = ["Cadastro", "Nome", "Evento", "Ref", "Valor", "Competência"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let check = SchemaValidator.check_headers(RecordKind::PayrollClosure, &headers);
        let row: RawRow = [
            ("Cadastro", CellValue::Number(100200.0)),
            ("Nome", CellValue::from_text("Ana")),
            ("Evento", CellValue::Number(1.0)),
            ("Ref", CellValue::from_text("")),
            ("Valor", CellValue::from_text("1.234,56")),
            ("Competência", CellValue::from_text("17/03/2025")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let record = FieldMapper::new(&check.columns).map_payroll(&row).unwrap();
        assert_eq!(record.event_code, "1");
        assert_eq!(record.reference, None);
        assert_eq!(record.value, 1234.56);
        assert_eq!(record.competence, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    }
}
