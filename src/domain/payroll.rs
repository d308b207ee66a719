// ==========================================
// 人事薪资后台 - 薪资领域模型
// ==========================================
// 冲突键: competence（每个自然月最多一批）
// ==========================================

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollRecord {
    pub registration: i64,     // 必须已存在于员工集合
    pub name: String,
    pub event_code: String,    // 薪资事件代码
    pub reference: Option<f64>, // 参考值（小时/天数/百分比）
    pub value: f64,            // 金额
    pub competence: NaiveDate, // 所属月份（月初）
}

/// 归一为月初
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// 下月月初
pub fn next_month_start(date: NaiveDate) -> NaiveDate {
    let start = month_start(date);
    let (year, month) = if start.month() == 12 {
        (start.year() + 1, 1)
    } else {
        (start.year(), start.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_bounds() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
        assert_eq!(month_start(d), NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(next_month_start(d), NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());

        let dec = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(next_month_start(dec), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }
}
