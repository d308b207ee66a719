// ==========================================
// 人事薪资后台 - 员工领域模型
// ==========================================
// 职责: 员工花名册规范记录
// 主键: registration（全集合唯一，用于新增/更新分流）
// ==========================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// EmployeeRecord - 员工记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    // ===== 主键 =====
    pub registration: i64, // 登记号（自然键）

    // ===== 基础信息 =====
    pub company_id: Option<i64>,      // 公司编号
    pub name: String,                 // 姓名
    pub cpf: Option<String>,          // CPF（###.###.###-##）
    pub birth_date: Option<NaiveDate>, // 出生日期
    pub hire_date: Option<NaiveDate>, // 入职日期
    pub status_date: Option<NaiveDate>, // 状态日期
    pub status_code: Option<i32>,     // 状态码

    // ===== 自由文本 =====
    pub role: Option<String>,
    pub sector: Option<String>,
    pub nationality: Option<String>,
    pub education: Option<String>,
    pub sex: Option<String>,
    pub marital_status: Option<String>,
    pub ethnicity: Option<String>,

    // ===== 薪资 =====
    pub salary: Option<f64>,

    // ===== 审计字段 =====
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl EmployeeRecord {
    /// 仅含主键与姓名的最小记录
    pub fn new(registration: i64, name: impl Into<String>) -> Self {
        Self {
            registration,
            company_id: None,
            name: name.into(),
            cpf: None,
            birth_date: None,
            hire_date: None,
            status_date: None,
            status_code: None,
            role: None,
            sector: None,
            nationality: None,
            education: None,
            sex: None,
            marital_status: None,
            ethnicity: None,
            salary: None,
            registered_by: None,
            registered_at: None,
            updated_by: None,
            updated_at: None,
        }
    }

    /// 标记为新增（写入登记人/时间）
    pub fn stamp_registered(mut self, user: &str, at: DateTime<Utc>) -> Self {
        self.registered_by = Some(user.to_string());
        self.registered_at = Some(at);
        self
    }

    /// 标记为更新（写入更新人/时间）
    pub fn stamp_updated(mut self, user: &str, at: DateTime<Utc>) -> Self {
        self.updated_by = Some(user.to_string());
        self.updated_at = Some(at);
        self
    }
}
