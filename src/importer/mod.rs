// ==========================================
// 人事薪资后台 - 导入层
// ==========================================
// 职责: 工作簿解码、单元格标准化、表头/行校验、加班报表转换
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod cell_normalizer;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod import_trait;
pub mod overtime_transformer;
pub mod schema_validator;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use field_mapper::{preview_row, FieldMapper};
pub use file_parser::{CellValue, CsvParser, ExcelParser, RawRow, UniversalFileParser, Workbook};
pub use import_trait::FileParser;
pub use overtime_transformer::{OvertimeLayout, OvertimeRow, OvertimeSheet, OvertimeTransformer};
pub use schema_validator::{ColumnMap, FieldFormat, FieldSpec, HeaderCheck, SchemaValidator};
