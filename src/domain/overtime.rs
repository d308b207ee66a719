// ==========================================
// 人事薪资后台 - 加班领域模型
// ==========================================
// 冲突键: 本批次出现的日期集合
// 时长单位: 分钟（非负）
// ==========================================

use crate::domain::types::OvertimeCode;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// OvertimeBuckets - 六类加班时长累计
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeBuckets([u32; 6]);

impl OvertimeBuckets {
    pub fn get(&self, code: OvertimeCode) -> u32 {
        self.0[code.index()]
    }

    pub fn set(&mut self, code: OvertimeCode, minutes: u32) {
        self.0[code.index()] = minutes;
    }

    pub fn add(&mut self, code: OvertimeCode, minutes: u32) {
        let slot = &mut self.0[code.index()];
        *slot = slot.saturating_add(minutes);
    }

    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

// ==========================================
// OvertimeRecord - 加班记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvertimeRecord {
    pub registration: i64,
    pub name: String,
    pub date: NaiveDate,
    #[serde(rename = "303")]
    pub minutes_303: u32,
    #[serde(rename = "304")]
    pub minutes_304: u32,
    #[serde(rename = "505")]
    pub minutes_505: u32,
    #[serde(rename = "506")]
    pub minutes_506: u32,
    #[serde(rename = "511")]
    pub minutes_511: u32,
    #[serde(rename = "512")]
    pub minutes_512: u32,
}

impl OvertimeRecord {
    pub fn from_buckets(
        registration: i64,
        name: impl Into<String>,
        date: NaiveDate,
        buckets: &OvertimeBuckets,
    ) -> Self {
        Self {
            registration,
            name: name.into(),
            date,
            minutes_303: buckets.get(OvertimeCode::C303),
            minutes_304: buckets.get(OvertimeCode::C304),
            minutes_505: buckets.get(OvertimeCode::C505),
            minutes_506: buckets.get(OvertimeCode::C506),
            minutes_511: buckets.get(OvertimeCode::C511),
            minutes_512: buckets.get(OvertimeCode::C512),
        }
    }

    pub fn buckets(&self) -> OvertimeBuckets {
        let mut buckets = OvertimeBuckets::default();
        buckets.set(OvertimeCode::C303, self.minutes_303);
        buckets.set(OvertimeCode::C304, self.minutes_304);
        buckets.set(OvertimeCode::C505, self.minutes_505);
        buckets.set(OvertimeCode::C506, self.minutes_506);
        buckets.set(OvertimeCode::C511, self.minutes_511);
        buckets.set(OvertimeCode::C512, self.minutes_512);
        buckets
    }
}
