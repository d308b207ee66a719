// ==========================================
// 人事薪资后台 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输出: 表头行 + 按表头键控的行 + 原始坐标网格
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_trait::FileParser;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

// ==========================================
// CellValue - 单元格原始值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Number(f64),
    /// Excel 序列值（类型化日期/时间单元格）
    DateTime(f64),
    Text(String),
    Bool(bool),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// 由文本构造（去除首尾空白，空串视为 Empty）
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 数值视图（Number / DateTime）
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) | CellValue::DateTime(n) => Some(*n),
            _ => None,
        }
    }

    /// 展示文本（整数值不带小数部分）
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) | CellValue::DateTime(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Bool(b) => b.to_string(),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty => CellValue::Empty,
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
                CellValue::from_text(s)
            }
            Data::Error(_) => CellValue::Empty,
        }
    }
}

/// 键控行（原始表头 → 单元格）
pub type RawRow = HashMap<String, CellValue>;

// ==========================================
// Workbook - 解码结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub headers: Vec<String>,
    /// 数据行（全空行已跳过）
    pub rows: Vec<RawRow>,
    /// 原始网格（含表头行与空行，坐标从 0 开始）
    pub grid: Vec<Vec<CellValue>>,
}

impl Workbook {
    /// 由原始网格构建（首个非空行作为表头）
    pub fn from_grid(grid: Vec<Vec<CellValue>>) -> Self {
        let header_idx = grid
            .iter()
            .position(|row| row.iter().any(|c| !c.is_empty()));

        let Some(header_idx) = header_idx else {
            return Self {
                headers: Vec::new(),
                rows: Vec::new(),
                grid,
            };
        };

        let headers: Vec<String> = grid[header_idx].iter().map(|c| c.as_text()).collect();

        let mut rows = Vec::new();
        for data_row in grid.iter().skip(header_idx + 1) {
            let mut row_map = HashMap::new();
            for (col_idx, cell) in data_row.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    if header.is_empty() {
                        continue;
                    }
                    row_map.insert(header.clone(), cell.clone());
                }
            }

            // 跳过完全空白的行
            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }
            rows.push(row_map);
        }

        Self {
            headers: headers.into_iter().filter(|h| !h.is_empty()).collect(),
            rows,
            grid,
        }
    }

    /// 按坐标取单元格（越界返回 Empty）
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.grid
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn is_empty(&self) -> bool {
        self.grid.iter().all(|row| row.iter().all(|c| c.is_empty()))
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 分隔符探测（首行中 ';' 多于 ',' 时使用 ';'）
    fn sniff_delimiter(text: &str) -> u8 {
        let first_line = text.lines().next().unwrap_or("");
        let semicolons = first_line.matches(';').count();
        let commas = first_line.matches(',').count();
        if semicolons > commas {
            b';'
        } else {
            b','
        }
    }

    /// UTF-8 优先，失败时按 Latin-1 解码（常见于本地导出）
    fn decode(bytes: &[u8]) -> String {
        let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
        match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

impl FileParser for CsvParser {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<Workbook> {
        let text = Self::decode(bytes);
        let delimiter = Self::sniff_delimiter(&text);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .delimiter(delimiter)
            .from_reader(text.as_bytes());

        let mut grid = Vec::new();
        for result in reader.records() {
            let record = result?;
            grid.push(record.iter().map(CellValue::from_text).collect());
        }

        debug!(rows = grid.len(), delimiter = %(delimiter as char), "CSV 解码完成");
        Ok(Workbook::from_grid(grid))
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<Workbook> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

        // 读取第一个 sheet
        let sheet_names = workbook.sheet_names();
        let Some(sheet_name) = sheet_names.first().cloned() else {
            return Ok(Workbook::default());
        };

        let range = workbook.worksheet_range(&sheet_name)?;

        // 区域可能不从 A1 开始，补齐偏移以保持绝对坐标
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut grid: Vec<Vec<CellValue>> = vec![Vec::new(); start_row as usize];
        for data_row in range.rows() {
            let mut row = vec![CellValue::Empty; start_col as usize];
            row.extend(data_row.iter().map(CellValue::from));
            grid.push(row);
        }

        debug!(sheet = %sheet_name, rows = grid.len(), "Excel 解码完成");
        Ok(Workbook::from_grid(grid))
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    fn parser_for(file_name: &str) -> ImportResult<Box<dyn FileParser>> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => Ok(Box::new(CsvParser)),
            "xlsx" | "xls" => Ok(Box::new(ExcelParser)),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }

    /// 解码上传内容（扩展名取自文件名）
    pub fn parse_bytes(&self, file_name: &str, bytes: &[u8]) -> ImportResult<Workbook> {
        Self::parser_for(file_name)?.parse_bytes(bytes)
    }

    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Workbook> {
        let path = file_path.as_ref();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        Self::parser_for(name)?.parse_path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_csv_parser_semicolon_file() {
        let mut temp_file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(temp_file, "Cadastro;Nome;Valor").unwrap();
        writeln!(temp_file, "100200;Ana Souza;1.234,56").unwrap();
        writeln!(temp_file, ";;").unwrap();
        writeln!(temp_file, "100300;Bruno Lima;99,90").unwrap();

        let workbook = UniversalFileParser.parse(temp_file.path()).unwrap();
        assert_eq!(workbook.headers, vec!["Cadastro", "Nome", "Valor"]);
        assert_eq!(workbook.rows.len(), 2);
        assert_eq!(
            workbook.rows[0].get("Valor"),
            Some(&CellValue::Text("1.234,56".to_string()))
        );
        // 空行保留在网格中
        assert_eq!(workbook.grid.len(), 4);
        assert_eq!(workbook.cell(3, 1).as_text(), "Bruno Lima");
    }

    #[test]
    fn test_csv_latin1_fallback() {
        let bytes = b"Matr\xedcula,Nome\n100200,Jo\xe3o\n";
        let workbook = CsvParser.parse_bytes(bytes).unwrap();
        assert_eq!(workbook.headers[0], "Matrícula");
        assert_eq!(workbook.rows[0].get("Nome").unwrap().as_text(), "João");
    }

    #[test]
    fn test_unsupported_extension() {
        let result = UniversalFileParser.parse_bytes("dados.txt", b"a,b");
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = UniversalFileParser.parse("/nonexistent/folha.csv");
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_cell_out_of_range_is_empty() {
        let workbook = Workbook::from_grid(vec![vec![CellValue::from_text("A")]]);
        assert_eq!(workbook.cell(5, 5), &CellValue::Empty);
        assert!(workbook.rows.is_empty());
    }

    #[test]
    fn test_integral_number_as_text() {
        assert_eq!(CellValue::Number(100200.0).as_text(), "100200");
        assert_eq!(CellValue::Number(1.5).as_text(), "1.5");
    }
}
