// ==========================================
// 人事薪资后台 - 加班报表转换器
// ==========================================
// 职责: 加班报表 → 每员工一行的六类时长合计
// 模式: 结构化表（规范表头直通）/ 非结构化多段报表（矩阵扫描）
// 红线: 空工作簿返回零行与空期间，不报错
// ==========================================

use crate::domain::overtime::{OvertimeBuckets, OvertimeRecord};
use crate::domain::session::ParsedRow;
use crate::domain::types::{OvertimeCode, RecordKind};
use crate::importer::cell_normalizer::{
    excel_serial_to_date, format_total, normalize_date, normalize_duration, normalize_header,
    normalize_integer, normalize_text, parse_date_text,
};
use crate::importer::file_parser::{CellValue, Workbook};
use crate::importer::schema_validator::{field_specs, has_all_overtime_codes, ColumnMap};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

/// 默认登记号阈值（数值 ≥ 阈值且右侧为姓名时视为员工表头行）
pub const DEFAULT_REGISTRATION_THRESHOLD: i64 = 100_000;

/// 默认参考日期单元格
pub const DEFAULT_REFERENCE_CELL: &str = "B2";

fn re_br_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{2}/\d{2}/\d{4})").unwrap())
}

fn re_time_like() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,3}:\d{2}(:\d{2})?$").unwrap())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OvertimeLayout {
    Structured,
    Unstructured,
}

// ==========================================
// OvertimeRow - 转换后的员工行
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct OvertimeRow {
    pub registration: Option<i64>,
    pub name: String,
    pub date: Option<NaiveDate>,
    pub buckets: OvertimeBuckets,
}

impl OvertimeRow {
    pub fn to_record(&self) -> Option<OvertimeRecord> {
        Some(OvertimeRecord::from_buckets(
            self.registration?,
            self.name.clone(),
            self.date?,
            &self.buckets,
        ))
    }

    /// 预览行（时长 HH:MM，零值为空串）
    pub fn preview(&self) -> ParsedRow {
        let mut row = ParsedRow::new();
        row.insert(
            "registration".to_string(),
            self.registration.map(|r| r.to_string()).unwrap_or_default(),
        );
        row.insert("name".to_string(), self.name.clone());
        row.insert(
            "date".to_string(),
            self.date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        );
        for code in OvertimeCode::ALL {
            row.insert(code.as_str().to_string(), format_total(self.buckets.get(code)));
        }
        row
    }
}

#[derive(Debug, Clone)]
pub struct OvertimeSheet {
    pub layout: OvertimeLayout,
    pub period: Option<NaiveDate>,
    pub rows: Vec<OvertimeRow>,
}

impl OvertimeSheet {
    /// 期间展示（无期间为空串）
    pub fn period_label(&self) -> String {
        self.period
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_default()
    }
}

/// A1 记法 → (行, 列)，从 0 开始
pub fn parse_a1(cell: &str) -> Option<(usize, usize)> {
    let cell = cell.trim().to_ascii_uppercase();
    let split = cell.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }
    let col = letters
        .chars()
        .fold(0usize, |acc, c| acc * 26 + (c as usize - 'A' as usize + 1));
    let row: usize = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}

// ==========================================
// OvertimeTransformer
// ==========================================
pub struct OvertimeTransformer {
    registration_threshold: i64,
    reference_cell: (usize, usize),
}

impl Default for OvertimeTransformer {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRATION_THRESHOLD, DEFAULT_REFERENCE_CELL)
    }
}

impl OvertimeTransformer {
    /// # 参数
    /// - registration_threshold: 登记号识别阈值
    /// - reference_cell: 参考日期单元格（A1 记法，无效时回退 B2）
    pub fn new(registration_threshold: i64, reference_cell: &str) -> Self {
        Self {
            registration_threshold,
            reference_cell: parse_a1(reference_cell).unwrap_or((1, 1)),
        }
    }

    pub fn detect_layout(&self, workbook: &Workbook) -> (OvertimeLayout, ColumnMap) {
        let columns = ColumnMap::resolve(
            &workbook.headers,
            field_specs(RecordKind::OvertimeReport),
        );
        let structured = columns.contains("registration")
            && columns.contains("name")
            && has_all_overtime_codes(&columns);
        if structured {
            (OvertimeLayout::Structured, columns)
        } else {
            (OvertimeLayout::Unstructured, columns)
        }
    }

    pub fn transform(&self, workbook: &Workbook) -> OvertimeSheet {
        if workbook.is_empty() {
            return OvertimeSheet {
                layout: OvertimeLayout::Unstructured,
                period: None,
                rows: Vec::new(),
            };
        }

        let period = self.find_period(workbook);
        let (layout, columns) = self.detect_layout(workbook);
        let rows = match layout {
            OvertimeLayout::Structured => self.transform_structured(workbook, &columns, period),
            OvertimeLayout::Unstructured => self.transform_unstructured(workbook, period),
        };

        debug!(?layout, ?period, rows = rows.len(), "加班报表转换完成");
        OvertimeSheet {
            layout,
            period,
            rows,
        }
    }

    // ===== 结构化表 =====
    fn transform_structured(
        &self,
        workbook: &Workbook,
        columns: &ColumnMap,
        period: Option<NaiveDate>,
    ) -> Vec<OvertimeRow> {
        workbook
            .rows
            .iter()
            .map(|row| {
                let mut buckets = OvertimeBuckets::default();
                for code in OvertimeCode::ALL {
                    buckets.set(code, normalize_duration(columns.value(row, code.as_str())));
                }
                OvertimeRow {
                    registration: normalize_integer(columns.value(row, "registration")),
                    name: normalize_text(columns.value(row, "name")).unwrap_or_default(),
                    date: normalize_date(columns.value(row, "date")).or(period),
                    buckets,
                }
            })
            .collect()
    }

    // ===== 非结构化报表 =====
    fn transform_unstructured(
        &self,
        workbook: &Workbook,
        period: Option<NaiveDate>,
    ) -> Vec<OvertimeRow> {
        let mut totals: BTreeMap<i64, (String, OvertimeBuckets)> = BTreeMap::new();
        let mut current: Option<i64> = None;

        for row in &workbook.grid {
            if let Some((registration, name)) = self.find_employee_header(row) {
                current = Some(registration);
                totals
                    .entry(registration)
                    .or_insert_with(|| (name, OvertimeBuckets::default()));
            }

            let Some(registration) = current else {
                continue;
            };
            if let Some((code, minutes)) = find_code_duration(row) {
                if let Some((_, buckets)) = totals.get_mut(&registration) {
                    buckets.add(code, minutes);
                }
            }
        }

        totals
            .into_iter()
            .map(|(registration, (name, buckets))| OvertimeRow {
                registration: Some(registration),
                name,
                date: period,
                buckets,
            })
            .collect()
    }

    /// 员工表头行: 第 i 列为 ≥ 阈值的数值，第 i+1 列为非数值文本
    fn find_employee_header(&self, row: &[CellValue]) -> Option<(i64, String)> {
        row.windows(2).find_map(|pair| {
            let registration = normalize_integer(&pair[0])?;
            if registration < self.registration_threshold {
                return None;
            }
            match &pair[1] {
                CellValue::Text(name) if !name.trim().is_empty() && name.trim().parse::<f64>().is_err() => {
                    Some((registration, name.trim().to_string()))
                }
                _ => None,
            }
        })
    }

    // ===== 期间 =====
    /// 先取固定参考单元格，再找 "Período:" 标签
    fn find_period(&self, workbook: &Workbook) -> Option<NaiveDate> {
        let (r, c) = self.reference_cell;
        reference_date(workbook.cell(r, c)).or_else(|| find_period_label(workbook))
    }
}

/// 参考日期单元格: 类型化日期或日期文本（纯数字不接受）
fn reference_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::DateTime(serial) => excel_serial_to_date(*serial),
        CellValue::Text(s) => re_br_date()
            .captures(s)
            .and_then(|caps| parse_date_text(&caps[1]))
            .or_else(|| {
                if s.trim().parse::<f64>().is_ok() {
                    None
                } else {
                    parse_date_text(s)
                }
            }),
        _ => None,
    }
}

fn find_period_label(workbook: &Workbook) -> Option<NaiveDate> {
    for row in &workbook.grid {
        for (idx, cell) in row.iter().enumerate() {
            let CellValue::Text(text) = cell else {
                continue;
            };
            if !normalize_header(text).starts_with("periodo") {
                continue;
            }
            // 同一单元格内的日期，否则取右侧单元格
            if let Some(caps) = re_br_date().captures(text) {
                if let Some(date) = parse_date_text(&caps[1]) {
                    return Some(date);
                }
            }
            if let Some(date) = row.get(idx + 1).and_then(reference_date) {
                return Some(date);
            }
        }
    }
    None
}

fn as_code(cell: &CellValue) -> Option<OvertimeCode> {
    match cell {
        CellValue::Text(s) => OvertimeCode::from_token(s),
        CellValue::Number(_) => OvertimeCode::from_token(&cell.as_text()),
        _ => None,
    }
}

fn is_time_like(cell: &CellValue) -> bool {
    match cell {
        CellValue::Text(s) => re_time_like().is_match(s.trim()),
        CellValue::Number(n) | CellValue::DateTime(n) => *n > 0.0 && *n < 1.0,
        _ => false,
    }
}

/// 行内第一个加班代码及其后的时长（找不到时回退全行搜索）
fn find_code_duration(row: &[CellValue]) -> Option<(OvertimeCode, u32)> {
    let (code_idx, code) = row
        .iter()
        .enumerate()
        .find_map(|(i, cell)| as_code(cell).map(|code| (i, code)))?;

    let duration_cell = row[code_idx + 1..]
        .iter()
        .find(|c| is_time_like(c))
        .or_else(|| {
            row.iter()
                .enumerate()
                .find(|(i, c)| *i != code_idx && is_time_like(c))
                .map(|(_, c)| c)
        })?;

    Some((code, normalize_duration(duration_cell)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> CellValue {
        CellValue::from_text(s)
    }

    #[test]
    fn test_parse_a1() {
        assert_eq!(parse_a1("B2"), Some((1, 1)));
        assert_eq!(parse_a1("a1"), Some((0, 0)));
        assert_eq!(parse_a1("AA10"), Some((9, 26)));
        assert_eq!(parse_a1("B0"), None);
        assert_eq!(parse_a1("12"), None);
    }

    #[test]
    fn test_empty_workbook() {
        let sheet = OvertimeTransformer::default().transform(&Workbook::default());
        assert!(sheet.rows.is_empty());
        assert_eq!(sheet.period_label(), "");
    }

    #[test]
    fn test_code_duration_fallback_to_any_column() {
        let row = vec![t("0:45"), CellValue::Empty, t("505")];
        assert_eq!(find_code_duration(&row), Some((OvertimeCode::C505, 45)));
    }

    #[test]
    fn test_employee_header_requires_threshold_and_name() {
        let transformer = OvertimeTransformer::default();
        assert_eq!(
            transformer.find_employee_header(&[CellValue::Number(100123.0), t("MARIA")]),
            Some((100123, "MARIA".to_string()))
        );
        assert!(transformer
            .find_employee_header(&[CellValue::Number(99999.0), t("MARIA")])
            .is_none());
        assert!(transformer
            .find_employee_header(&[CellValue::Number(100123.0), t("123")])
            .is_none());
    }

    #[test]
    fn test_period_label_next_cell() {
        let grid = vec![
            vec![t("Relatório de horas")],
            vec![CellValue::Empty, CellValue::Empty],
            vec![t("Período:"), t("10/03/2025 a 16/03/2025")],
        ];
        let workbook = Workbook::from_grid(grid);
        let sheet = OvertimeTransformer::default().transform(&workbook);
        assert_eq!(sheet.period, NaiveDate::from_ymd_opt(2025, 3, 10));
    }
}
