// ==========================================
// 人事薪资后台 - 表头 / 行校验器
// ==========================================
// 职责: 规范字段定义 + 表头缺失检测 + 必填字段行校验
// 红线: 表头校验失败时不做任何行处理
// ==========================================

use crate::domain::session::{FieldError, RowError};
use crate::domain::types::{OvertimeCode, RecordKind};
use crate::i18n::t;
use crate::importer::cell_normalizer::{
    digits_only, normalize_date, normalize_decimal, normalize_header, normalize_integer,
};
use crate::importer::file_parser::{CellValue, RawRow};
use crate::importer::overtime_transformer::OvertimeRow;
use std::collections::HashMap;

static EMPTY_CELL: CellValue = CellValue::Empty;

// ==========================================
// FieldSpec - 规范字段定义
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    Text,
    Integer,
    Date,
    Decimal,
    Cpf,
    Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub canonical: &'static str,
    /// 折叠后的表头写法（去重音、小写）
    pub aliases: &'static [&'static str],
    pub required: bool,
    pub format: FieldFormat,
}

const fn field(
    canonical: &'static str,
    aliases: &'static [&'static str],
    required: bool,
    format: FieldFormat,
) -> FieldSpec {
    FieldSpec {
        canonical,
        aliases,
        required,
        format,
    }
}

const REGISTRATION_ALIASES: &[&str] = &["cadastro", "matricula", "registro", "registration"];
const NAME_ALIASES: &[&str] = &["nome", "nome completo", "colaborador", "funcionario", "name"];

const EMPLOYEE_FIELDS: &[FieldSpec] = &[
    field("company_id", &["empresa", "cod empresa", "codigo empresa", "company"], true, FieldFormat::Integer),
    field("registration", REGISTRATION_ALIASES, true, FieldFormat::Integer),
    field("name", NAME_ALIASES, true, FieldFormat::Text),
    field("cpf", &["cpf", "cpf colaborador"], true, FieldFormat::Cpf),
    field("birth_date", &["nascimento", "data nascimento", "data de nascimento", "dt nascimento"], true, FieldFormat::Date),
    field("hire_date", &["admissao", "data admissao", "data de admissao", "dt admissao"], true, FieldFormat::Date),
    field("status_code", &["situacao", "cod situacao", "codigo situacao"], true, FieldFormat::Integer),
    field("status_date", &["data situacao", "data da situacao", "data afastamento"], false, FieldFormat::Date),
    field("role", &["cargo", "funcao", "titulo cargo"], false, FieldFormat::Text),
    field("sector", &["setor", "local", "departamento", "centro de custo"], false, FieldFormat::Text),
    field("nationality", &["nacionalidade"], false, FieldFormat::Text),
    field("education", &["escolaridade", "grau instrucao", "grau de instrucao", "instrucao"], false, FieldFormat::Text),
    field("sex", &["sexo", "genero"], false, FieldFormat::Text),
    field("marital_status", &["estado civil"], false, FieldFormat::Text),
    field("ethnicity", &["raca", "raca cor", "etnia"], false, FieldFormat::Text),
    field("salary", &["salario", "salario base", "remuneracao"], false, FieldFormat::Decimal),
];

const PAYROLL_FIELDS: &[FieldSpec] = &[
    field("registration", REGISTRATION_ALIASES, true, FieldFormat::Integer),
    field("name", NAME_ALIASES, true, FieldFormat::Text),
    field("event_code", &["evento", "cod evento", "codigo evento", "verba"], true, FieldFormat::Text),
    field("reference", &["referencia", "ref"], true, FieldFormat::Decimal),
    field("value", &["valor", "valor evento"], true, FieldFormat::Decimal),
    field("competence", &["competencia", "mes competencia", "periodo"], true, FieldFormat::Date),
];

const OVERTIME_FIELDS: &[FieldSpec] = &[
    field("date", &["data", "date"], false, FieldFormat::Date),
    field("registration", REGISTRATION_ALIASES, true, FieldFormat::Integer),
    field("name", NAME_ALIASES, true, FieldFormat::Text),
    field("303", &["303"], true, FieldFormat::Duration),
    field("304", &["304"], true, FieldFormat::Duration),
    field("505", &["505"], true, FieldFormat::Duration),
    field("506", &["506"], true, FieldFormat::Duration),
    field("511", &["511"], true, FieldFormat::Duration),
    field("512", &["512"], true, FieldFormat::Duration),
];

/// 记录类型的规范字段表
pub fn field_specs(kind: RecordKind) -> &'static [FieldSpec] {
    match kind {
        RecordKind::EmployeeRoster => EMPLOYEE_FIELDS,
        RecordKind::PayrollClosure => PAYROLL_FIELDS,
        RecordKind::OvertimeReport => OVERTIME_FIELDS,
    }
}

// ==========================================
// ColumnMap - 规范字段 → 原始表头
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    columns: HashMap<&'static str, String>,
    order: Vec<&'static str>,
}

impl ColumnMap {
    /// 按别名解析表头（每个规范字段取第一个匹配列）
    pub fn resolve(headers: &[String], specs: &[FieldSpec]) -> Self {
        let folded: Vec<(String, &String)> =
            headers.iter().map(|h| (normalize_header(h), h)).collect();

        let mut map = ColumnMap::default();
        for spec in specs {
            let hit = folded
                .iter()
                .find(|(norm, _)| spec.aliases.iter().any(|a| a == norm));
            if let Some((_, original)) = hit {
                map.columns.insert(spec.canonical, (*original).clone());
                map.order.push(spec.canonical);
            }
        }
        map
    }

    pub fn header(&self, canonical: &str) -> Option<&str> {
        self.columns.get(canonical).map(String::as_str)
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.columns.contains_key(canonical)
    }

    /// 行中规范字段的单元格（列缺失时为 Empty）
    pub fn value<'a>(&self, row: &'a RawRow, canonical: &str) -> &'a CellValue {
        self.header(canonical)
            .and_then(|h| row.get(h))
            .unwrap_or(&EMPTY_CELL)
    }

    /// 已识别的规范字段（按字段表顺序）
    pub fn canonical_columns(&self) -> Vec<String> {
        self.order.iter().map(|c| c.to_string()).collect()
    }
}

// ==========================================
// HeaderCheck - 表头校验结果
// ==========================================
#[derive(Debug, Clone)]
pub struct HeaderCheck {
    pub columns: ColumnMap,
    pub missing: Vec<String>,
}

impl HeaderCheck {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty()
    }
}

// ==========================================
// SchemaValidator
// ==========================================
pub struct SchemaValidator;

impl SchemaValidator {
    /// 表头校验: 返回缺失的规范字段名
    pub fn check_headers(&self, kind: RecordKind, headers: &[String]) -> HeaderCheck {
        let specs = field_specs(kind);
        let columns = ColumnMap::resolve(headers, specs);
        let missing = specs
            .iter()
            .filter(|s| s.required && !columns.contains(s.canonical))
            .map(|s| s.canonical.to_string())
            .collect();
        HeaderCheck { columns, missing }
    }

    /// 行校验: 必填字段非空且格式有效
    ///
    /// # 返回
    /// - 每个有问题的行一条 RowError（row_index = 下标 + 2）
    pub fn validate_rows(
        &self,
        kind: RecordKind,
        columns: &ColumnMap,
        rows: &[RawRow],
    ) -> Vec<RowError> {
        let specs = field_specs(kind);
        rows.iter()
            .enumerate()
            .filter_map(|(idx, row)| {
                let errors: Vec<FieldError> = specs
                    .iter()
                    .filter(|s| s.required)
                    .filter_map(|s| check_field(s, columns.value(row, s.canonical)))
                    .collect();
                (!errors.is_empty()).then_some(RowError {
                    row_index: idx + 2,
                    errors,
                })
            })
            .collect()
    }

    /// 加班行校验（转换之后）: 登记号、姓名、日期
    pub fn validate_overtime_rows(&self, rows: &[OvertimeRow]) -> Vec<RowError> {
        rows.iter()
            .enumerate()
            .filter_map(|(idx, row)| {
                let mut errors = Vec::new();
                if row.registration.is_none() {
                    errors.push(required_error("registration"));
                }
                if row.name.trim().is_empty() {
                    errors.push(required_error("name"));
                }
                if row.date.is_none() {
                    errors.push(required_error("date"));
                }
                (!errors.is_empty()).then_some(RowError {
                    row_index: idx + 2,
                    errors,
                })
            })
            .collect()
    }
}

fn required_error(field: &str) -> FieldError {
    FieldError {
        field: field.to_string(),
        message: t("validation.required"),
    }
}

fn check_field(spec: &FieldSpec, cell: &CellValue) -> Option<FieldError> {
    if cell.is_empty() {
        return Some(required_error(spec.canonical));
    }

    let valid = match spec.format {
        FieldFormat::Text | FieldFormat::Duration => true,
        FieldFormat::Integer => normalize_integer(cell).is_some(),
        FieldFormat::Date => normalize_date(cell).is_some(),
        FieldFormat::Decimal => normalize_decimal(cell).is_some(),
        FieldFormat::Cpf => {
            let n = digits_only(&cell.as_text()).len();
            (1..=11).contains(&n)
        }
    };

    (!valid).then(|| FieldError {
        field: spec.canonical.to_string(),
        message: t("validation.invalid_format"),
    })
}

/// 加班代码列是否齐全（结构化表判定）
pub fn has_all_overtime_codes(columns: &ColumnMap) -> bool {
    OvertimeCode::ALL.iter().all(|c| columns.contains(c.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn row(pairs: &[(&str, CellValue)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_payroll_headers_with_aliases() {
        let check = SchemaValidator.check_headers(
            RecordKind::PayrollClosure,
            &headers(&["Matrícula", "NOME", "Evento", "Referência", "Valor", "Competência"]),
        );
        assert!(check.is_ok());
        assert_eq!(check.columns.header("registration"), Some("Matrícula"));
        assert_eq!(check.columns.header("competence"), Some("Competência"));
    }

    #[test]
    fn test_missing_headers_reported_by_canonical_name() {
        let check = SchemaValidator
            .check_headers(RecordKind::PayrollClosure, &headers(&["Cadastro", "Nome", "Valor"]));
        assert_eq!(
            check.missing,
            vec!["event_code", "reference", "competence"]
        );
    }

    #[test]
    fn test_row_errors_use_display_index() {
        let hdrs = headers(&["Cadastro", "Nome", "Evento", "Referência", "Valor", "Competência"]);
        let check = SchemaValidator.check_headers(RecordKind::PayrollClosure, &hdrs);
        let rows = vec![
            row(&[
                ("Cadastro", CellValue::Number(100200.0)),
                ("Nome", CellValue::from_text("Ana")),
                ("Evento", CellValue::from_text("001")),
                ("Referência", CellValue::from_text("30")),
                ("Valor", CellValue::from_text("1.234,56")),
                ("Competência", CellValue::from_text("01/03/2025")),
            ]),
            row(&[
                ("Cadastro", CellValue::from_text("abc")),
                ("Nome", CellValue::Empty),
                ("Evento", CellValue::from_text("001")),
                ("Referência", CellValue::from_text("30")),
                ("Valor", CellValue::from_text("10")),
                ("Competência", CellValue::from_text("13/13/2025")),
            ]),
        ];

        let errors = SchemaValidator.validate_rows(RecordKind::PayrollClosure, &check.columns, &rows);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].row_index, 3);
        let fields: Vec<_> = errors[0].errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["registration", "name", "competence"]);
    }

    #[test]
    fn test_cpf_digit_count() {
        let spec = EMPLOYEE_FIELDS[3];
        assert!(check_field(&spec, &CellValue::from_text("123.456.789-00")).is_none());
        assert!(check_field(&spec, &CellValue::from_text("1234567890123")).is_some());
        assert!(check_field(&spec, &CellValue::from_text("abc")).is_some());
    }

    #[test]
    fn test_structured_overtime_detection() {
        let hdrs = headers(&["Data", "Cadastro", "Nome", "303", "304", "505", "506", "511", "512"]);
        let check = SchemaValidator.check_headers(RecordKind::OvertimeReport, &hdrs);
        assert!(check.is_ok());
        assert!(has_all_overtime_codes(&check.columns));
    }
}
