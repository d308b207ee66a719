// ==========================================
// 人事薪资后台 - 通知输出
// ==========================================
// 职责: 把带级别的状态消息推送给外部（提示框 / 日志）
// ==========================================

use crate::domain::session::StatusMessage;
use crate::domain::types::Severity;
use std::sync::Mutex;
use tracing::{error, info, warn};

pub trait NotificationSink: Send + Sync {
    fn push(&self, message: &StatusMessage);
}

/// 写入 tracing 日志（CLI 默认）
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn push(&self, message: &StatusMessage) {
        match message.severity {
            Severity::Success | Severity::Info => {
                info!(severity = %message.severity, "{}", message.text)
            }
            Severity::Warning => warn!(severity = %message.severity, "{}", message.text),
            Severity::Error => error!(severity = %message.severity, "{}", message.text),
        }
    }
}

/// 收集所有消息（测试用）
#[derive(Default)]
pub struct CollectingNotificationSink {
    messages: Mutex<Vec<StatusMessage>>,
}

impl CollectingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<StatusMessage> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<StatusMessage> {
        self.messages().pop()
    }
}

impl NotificationSink for CollectingNotificationSink {
    fn push(&self, message: &StatusMessage) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.clone());
        }
    }
}
