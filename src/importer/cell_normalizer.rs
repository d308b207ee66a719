// ==========================================
// 人事薪资后台 - 单元格标准化
// ==========================================
// 职责: 原始单元格 → 规范值（日期 / 小数 / 时长分钟 / CPF / 表头）
// 红线: 纯函数，永不 panic，无法识别时返回 None 或 0
// ==========================================

use crate::importer::file_parser::CellValue;
use chrono::{Duration, NaiveDate};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// CPF 为空时的展示占位
pub const CPF_PLACEHOLDER: &str = "-";

const DATE_SENTINELS: [&str; 3] = ["00/00/0000", "0000-00-00", "0"];

fn excel_epoch() -> NaiveDate {
    // 1899-12-30 使序列值 60 之后与 Excel 对齐
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

// ==========================================
// 日期
// ==========================================

/// Excel 序列值 → 日期（按日历天计算，无时区漂移）
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    excel_epoch().checked_add_signed(Duration::days(serial.floor() as i64))
}

/// 日期 → Excel 序列值
pub fn date_to_excel_serial(date: NaiveDate) -> i64 {
    (date - excel_epoch()).num_days()
}

/// 文本日期: 数字序列 / YYYY-MM-DD / DD/MM/YYYY
pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() || DATE_SENTINELS.contains(&s) {
        return None;
    }

    if let Ok(serial) = s.parse::<f64>() {
        return excel_serial_to_date(serial);
    }

    // 带时间部分时只取日期
    let date_part = s.split(['T', ' ']).next().unwrap_or(s);
    if date_part.len() >= 10 {
        if let Some(prefix) = date_part.get(..10) {
            if let Ok(d) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
                return Some(d);
            }
        }
    }

    NaiveDate::parse_from_str(date_part, "%d/%m/%Y").ok()
}

pub fn normalize_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Number(n) | CellValue::DateTime(n) => excel_serial_to_date(*n),
        CellValue::Text(s) => parse_date_text(s),
        _ => None,
    }
}

// ==========================================
// 金额 / 小数
// ==========================================

/// 混合分隔符的小数解析
///
/// - 同时出现 ',' 与 '.': 最后出现者为小数点
/// - 仅 ',': 单个为小数点，多个为千分位
/// - 仅 '.': 多个为千分位
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let last_comma = cleaned.rfind(',');
    let last_dot = cleaned.rfind('.');
    let normalized = match (last_comma, last_dot) {
        (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) if cleaned.matches(',').count() == 1 => cleaned.replace(',', "."),
        (Some(_), None) => cleaned.replace(',', ""),
        (None, Some(_)) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn normalize_decimal(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(s) => parse_decimal(s),
        _ => None,
    }
}

// ==========================================
// 时长（分钟）
// ==========================================

/// 文本时长: H:MM[:SS] 或小数小时（',' 或 '.'）；无法识别为 0
pub fn parse_duration_text(raw: &str) -> u32 {
    let s = raw.trim();
    if s.is_empty() {
        return 0;
    }

    if s.contains(':') {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        if parts.len() < 2 || parts.len() > 3 {
            return 0;
        }
        let nums: Option<Vec<u32>> = parts.iter().map(|p| p.parse::<u32>().ok()).collect();
        return match nums.as_deref() {
            Some([h, m]) => h.saturating_mul(60).saturating_add(*m),
            Some([h, m, sec]) => h
                .saturating_mul(60)
                .saturating_add(*m)
                .saturating_add(if *sec >= 30 { 1 } else { 0 }),
            _ => 0,
        };
    }

    match s.replace(',', ".").parse::<f64>() {
        Ok(hours) if hours.is_finite() && hours > 0.0 => (hours * 60.0).round() as u32,
        _ => 0,
    }
}

/// Excel 日分数 → 分钟
pub fn day_fraction_to_minutes(fraction: f64) -> u32 {
    if fraction.is_finite() && fraction > 0.0 {
        (fraction * 1440.0).round() as u32
    } else {
        0
    }
}

pub fn normalize_duration(cell: &CellValue) -> u32 {
    match cell {
        CellValue::Number(n) | CellValue::DateTime(n) => day_fraction_to_minutes(*n),
        CellValue::Text(s) => parse_duration_text(s),
        _ => 0,
    }
}

/// 分钟 → HH:MM
pub fn format_hhmm(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// 合计展示（0 为空串）
pub fn format_total(minutes: u32) -> String {
    if minutes == 0 {
        String::new()
    } else {
        format_hhmm(minutes)
    }
}

// ==========================================
// CPF / 文本
// ==========================================

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// CPF 格式化为 ###.###.###-##（左补零到 11 位）
pub fn format_cpf(raw: &str) -> String {
    let digits = digits_only(raw);
    if digits.is_empty() {
        return CPF_PLACEHOLDER.to_string();
    }
    let tail = &digits[digits.len().saturating_sub(11)..];
    let padded = format!("{:0>11}", tail);
    format!(
        "{}.{}.{}-{}",
        &padded[0..3],
        &padded[3..6],
        &padded[6..9],
        &padded[9..11]
    )
}

/// 单元格中的 CPF（数值单元格先转整数文本）
pub fn normalize_cpf(cell: &CellValue) -> Option<String> {
    let text = cell.as_text();
    if digits_only(&text).is_empty() {
        None
    } else {
        Some(format_cpf(&text))
    }
}

/// 表头折叠: 去重音、小写、非字母数字转空格、合并空白
pub fn normalize_header(raw: &str) -> String {
    let folded: String = raw
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_text(cell: &CellValue) -> Option<String> {
    let text = cell.as_text();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// 整数字段（注册号 / 代码）；"100200.0" 视为 100200
pub fn normalize_integer(cell: &CellValue) -> Option<i64> {
    match cell {
        CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(*n as i64),
        CellValue::Text(s) => {
            let s = s.trim();
            let s = s.strip_suffix(".0").unwrap_or(s);
            s.parse::<i64>().ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_serial_dates() {
        assert_eq!(excel_serial_to_date(45717.0), Some(ymd(2025, 3, 1)));
        assert_eq!(excel_serial_to_date(45717.75), Some(ymd(2025, 3, 1)));
        assert_eq!(excel_serial_to_date(0.0), None);
        assert_eq!(excel_serial_to_date(f64::NAN), None);
    }

    #[test]
    fn test_serial_round_trip() {
        for serial in [1_i64, 59, 61, 366, 25569, 45717, 60000] {
            let date = excel_serial_to_date(serial as f64).unwrap();
            assert_eq!(date_to_excel_serial(date), serial);
        }
    }

    #[test]
    fn test_text_dates() {
        assert_eq!(parse_date_text("2025-03-10"), Some(ymd(2025, 3, 10)));
        assert_eq!(parse_date_text("2025-03-10T00:00:00"), Some(ymd(2025, 3, 10)));
        assert_eq!(parse_date_text("10/03/2025"), Some(ymd(2025, 3, 10)));
        assert_eq!(parse_date_text("45717"), Some(ymd(2025, 3, 1)));
        assert_eq!(parse_date_text("00/00/0000"), None);
        assert_eq!(parse_date_text("0000-00-00"), None);
        assert_eq!(parse_date_text(""), None);
        assert_eq!(parse_date_text("ontem"), None);
    }

    #[test]
    fn test_decimal_separators() {
        assert_eq!(parse_decimal("1.234,56"), Some(1234.56));
        assert_eq!(parse_decimal("1234,56"), Some(1234.56));
        assert_eq!(parse_decimal("1234.56"), Some(1234.56));
        assert_eq!(parse_decimal("1.234.567"), Some(1234567.0));
        assert_eq!(parse_decimal("1,234.56"), Some(1234.56));
        assert_eq!(parse_decimal("1,234,567"), Some(1234567.0));
        assert_eq!(parse_decimal("R$ 2.500,00"), Some(2500.0));
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal(""), None);
    }

    #[test]
    fn test_durations() {
        assert_eq!(parse_duration_text("1:30"), 90);
        assert_eq!(parse_duration_text("1:30:40"), 91);
        assert_eq!(normalize_duration(&CellValue::Number(0.0625)), 90);
        assert_eq!(parse_duration_text("1,5"), 90);
        assert_eq!(parse_duration_text("1.5"), 90);
        assert_eq!(parse_duration_text(""), 0);
        assert_eq!(parse_duration_text("n/a"), 0);
        assert_eq!(normalize_duration(&CellValue::Empty), 0);
    }

    #[test]
    fn test_hhmm_formatting() {
        assert_eq!(format_hhmm(90), "01:30");
        assert_eq!(format_hhmm(45), "00:45");
        assert_eq!(format_total(0), "");
        assert_eq!(format_total(125), "02:05");
    }

    #[test]
    fn test_cpf_formatting() {
        assert_eq!(format_cpf("12345678900"), "123.456.789-00");
        assert_eq!(format_cpf("1"), "000.000.000-01");
        assert_eq!(format_cpf("123.456.789-00"), "123.456.789-00");
        assert_eq!(format_cpf(""), CPF_PLACEHOLDER);
        assert_eq!(normalize_cpf(&CellValue::Number(12345678900.0)).unwrap(), "123.456.789-00");
    }

    #[test]
    fn test_header_folding() {
        assert_eq!(normalize_header("  Matrícula "), "matricula");
        assert_eq!(normalize_header("Data de  Admissão"), "data de admissao");
        assert_eq!(normalize_header("Raça/Cor"), "raca cor");
        assert_eq!(normalize_header("Cód. Empresa"), "cod empresa");
    }

    #[test]
    fn test_integer_cells() {
        assert_eq!(normalize_integer(&CellValue::Number(100200.0)), Some(100200));
        assert_eq!(normalize_integer(&CellValue::Text("100200.0".into())), Some(100200));
        assert_eq!(normalize_integer(&CellValue::Number(1.5)), None);
        assert_eq!(normalize_integer(&CellValue::Text("abc".into())), None);
    }
}
