// ==========================================
// 人事薪资后台 - 导入 Trait
// ==========================================
// 职责: 定义工作簿解码接口（不包含实现）
// ==========================================

use crate::importer::error::ImportResult;
use crate::importer::file_parser::Workbook;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 原始字节 → 工作簿（表头 + 键控行 + 坐标网格）
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解码内存中的文件内容
    ///
    /// # 参数
    /// - bytes: 上传文件的原始字节
    ///
    /// # 返回
    /// - Ok(Workbook): 首个工作表的内容
    /// - Err: 格式错误
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<Workbook>;

    /// 从磁盘读取并解码
    fn parse_path(&self, path: &Path) -> ImportResult<Workbook> {
        if !path.exists() {
            return Err(crate::importer::error::ImportError::FileNotFound(
                path.display().to_string(),
            ));
        }
        let bytes = std::fs::read(path)?;
        self.parse_bytes(&bytes)
    }
}
