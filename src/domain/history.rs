// ==========================================
// 人事薪资后台 - 操作历史领域模型
// ==========================================
// 红线: 仅追加，客户端从不修改/删除
// 用途: 导入/删除审计追踪
// ==========================================

use crate::domain::types::{HistoryAction, HistoryKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// HistoryEntry - 历史记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,                  // 数字 ID（追加时生成）
    pub table_label: String,      // 目标集合标签（可含期间，如 "payroll Ref. 03/2025"）
    pub action: HistoryAction,    // 动作
    pub file_name: String,        // 源文件名
    pub user: String,             // 操作人
    pub timestamp: DateTime<Utc>, // 操作时间
    #[serde(rename = "type")]
    pub kind: HistoryKind,        // 来源类型
}

impl HistoryEntry {
    /// 创建新的历史记录（id 在追加时分配）
    pub fn new(
        table_label: impl Into<String>,
        action: HistoryAction,
        file_name: impl Into<String>,
        user: impl Into<String>,
        kind: HistoryKind,
    ) -> Self {
        Self {
            id: 0,
            table_label: table_label.into(),
            action,
            file_name: file_name.into(),
            user: user.into(),
            timestamp: Utc::now(),
            kind,
        }
    }

    /// 按远程列宽截断标签与文件名（按字符计）
    pub fn truncated(mut self, max_len: usize) -> Self {
        self.table_label = truncate_chars(&self.table_label, max_len);
        self.file_name = truncate_chars(&self.file_name, max_len);
        self
    }
}

fn truncate_chars(value: &str, max_len: usize) -> String {
    value.chars().take(max_len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_limits_label_and_file_name() {
        let long_name = "x".repeat(80);
        let entry = HistoryEntry::new(
            "payroll Ref. 03/2025",
            HistoryAction::Inclusao,
            long_name,
            "ana",
            HistoryKind::Importado,
        )
        .truncated(50);

        assert_eq!(entry.file_name.chars().count(), 50);
        assert_eq!(entry.table_label, "payroll Ref. 03/2025");
    }

    #[test]
    fn test_truncated_respects_multibyte() {
        let entry = HistoryEntry::new(
            "ção".repeat(30),
            HistoryAction::Delete,
            "folha.xlsx",
            "ana",
            HistoryKind::System,
        )
        .truncated(50);

        assert_eq!(entry.table_label.chars().count(), 50);
    }

    #[test]
    fn test_serialized_type_field() {
        let entry = HistoryEntry::new(
            "employees",
            HistoryAction::Update,
            "f.csv",
            "ana",
            HistoryKind::Manual,
        );
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "manual");
        assert_eq!(value["action"], "update");
    }
}
