// ==========================================
// 人事薪资后台 - 领域类型定义
// ==========================================
// 职责: 记录类型 / 导入状态 / 消息级别 / 加班代码 / 历史动作
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 记录类型 (Record Kind)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与前端标签一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordKind {
    EmployeeRoster, // 员工花名册
    PayrollClosure, // 薪资结算
    OvertimeReport, // 加班分摊报表
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [
        RecordKind::EmployeeRoster,
        RecordKind::PayrollClosure,
        RecordKind::OvertimeReport,
    ];

    /// 标签字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::EmployeeRoster => "EMPLOYEE_ROSTER",
            RecordKind::PayrollClosure => "PAYROLL_CLOSURE",
            RecordKind::OvertimeReport => "OVERTIME_REPORT",
        }
    }

    /// 从标签解析（同时接受命令行简写）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EMPLOYEE_ROSTER" | "EMPLOYEE" | "EMPLOYEES" => Some(RecordKind::EmployeeRoster),
            "PAYROLL_CLOSURE" | "PAYROLL" => Some(RecordKind::PayrollClosure),
            "OVERTIME_REPORT" | "OVERTIME" => Some(RecordKind::OvertimeReport),
            _ => None,
        }
    }

    /// 远程集合名
    pub fn collection(&self) -> &'static str {
        match self {
            RecordKind::EmployeeRoster => "employees",
            RecordKind::PayrollClosure => "payroll",
            RecordKind::OvertimeReport => "overtime",
        }
    }

    /// 期间字段名（花名册无期间）
    pub fn period_field(&self) -> Option<&'static str> {
        match self {
            RecordKind::EmployeeRoster => None,
            RecordKind::PayrollClosure => Some("competence"),
            RecordKind::OvertimeReport => Some("date"),
        }
    }

    /// 行校验错误是否阻断导入（花名册仅提示）
    pub fn row_errors_block(&self) -> bool {
        !matches!(self, RecordKind::EmployeeRoster)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 导入状态 (Import Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Idle,
    Validating,
    Uploading,
    Done,
    Error,
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportStatus::Idle => write!(f, "idle"),
            ImportStatus::Validating => write!(f, "validating"),
            ImportStatus::Uploading => write!(f, "uploading"),
            ImportStatus::Done => write!(f, "done"),
            ImportStatus::Error => write!(f, "error"),
        }
    }
}

// ==========================================
// 消息级别 (Severity)
// ==========================================
// 取代字符串前缀约定，显式携带级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Success => write!(f, "success"),
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

// ==========================================
// 加班代码 (Overtime Code)
// ==========================================
// 固定 6 类，每类独立累计时长
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OvertimeCode {
    #[serde(rename = "303")]
    C303,
    #[serde(rename = "304")]
    C304,
    #[serde(rename = "505")]
    C505,
    #[serde(rename = "506")]
    C506,
    #[serde(rename = "511")]
    C511,
    #[serde(rename = "512")]
    C512,
}

impl OvertimeCode {
    pub const ALL: [OvertimeCode; 6] = [
        OvertimeCode::C303,
        OvertimeCode::C304,
        OvertimeCode::C505,
        OvertimeCode::C506,
        OvertimeCode::C511,
        OvertimeCode::C512,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OvertimeCode::C303 => "303",
            OvertimeCode::C304 => "304",
            OvertimeCode::C505 => "505",
            OvertimeCode::C506 => "506",
            OvertimeCode::C511 => "511",
            OvertimeCode::C512 => "512",
        }
    }

    /// 在 ALL 中的下标（用于定长累计数组）
    pub fn index(&self) -> usize {
        match self {
            OvertimeCode::C303 => 0,
            OvertimeCode::C304 => 1,
            OvertimeCode::C505 => 2,
            OvertimeCode::C506 => 3,
            OvertimeCode::C511 => 4,
            OvertimeCode::C512 => 5,
        }
    }

    /// 精确匹配代码标记（"303" / "303.0"）
    pub fn from_token(token: &str) -> Option<Self> {
        let trimmed = token.trim();
        let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);
        Self::ALL.into_iter().find(|c| c.as_str() == trimmed)
    }
}

impl fmt::Display for OvertimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 历史动作 (History Action)
// ==========================================
// 存储值沿用既有历史表中的写法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryAction {
    #[serde(rename = "Inclusao")]
    Inclusao,
    #[serde(rename = "Delete")]
    Delete,
    #[serde(rename = "alterou")]
    Alterou,
    #[serde(rename = "update")]
    Update,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Inclusao => "Inclusao",
            HistoryAction::Delete => "Delete",
            HistoryAction::Alterou => "alterou",
            HistoryAction::Update => "update",
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 历史来源 (History Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryKind {
    #[serde(rename = "Importado")]
    Importado,
    #[serde(rename = "SYSTEM")]
    System,
    #[serde(rename = "manual")]
    Manual,
}

impl HistoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryKind::Importado => "Importado",
            HistoryKind::System => "SYSTEM",
            HistoryKind::Manual => "manual",
        }
    }
}

impl fmt::Display for HistoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 密码校验错误分类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordErrorKind {
    Required, // 未输入
    Invalid,  // 不匹配
}
