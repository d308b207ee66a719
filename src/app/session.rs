// ==========================================
// 人事薪资后台 - 会话存储
// ==========================================
// 职责: 当前用户 + 权限标志 + 已存储的密码摘要
// 红线: 导入核心只读，不修改会话
// ==========================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 密码摘要（SHA-256，小写十六进制）
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

// ==========================================
// SessionUser - 当前用户
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub display_name: String,
    pub password_hash: String,
    /// 逗号分隔的权限标志
    pub permissions: String,
}

impl SessionUser {
    pub fn new(id: &str, display_name: &str, password: &str, permissions: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            password_hash: hash_password(password),
            permissions: permissions.to_string(),
        }
    }

    /// 拆分后的权限标志（去空白、去空项）
    pub fn permissions(&self) -> Vec<&str> {
        self.permissions
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }

    /// 平面字符串匹配
    pub fn has_permission(&self, flag: &str) -> bool {
        self.permissions().contains(&flag.trim())
    }

    pub fn verify_password(&self, password: &str) -> bool {
        hash_password(password).eq_ignore_ascii_case(&self.password_hash)
    }
}

/// 独立期间删除所需的权限标志
pub const DELETE_PERMISSION: &str = "delete";

// ==========================================
// SessionStore Trait
// ==========================================
// 实现者: StaticSessionStore
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 当前登录用户（未登录为 None）
    async fn current_user(&self) -> Option<SessionUser>;
}

/// 固定用户的会话存储（CLI 与测试）
pub struct StaticSessionStore {
    user: Option<SessionUser>,
}

impl StaticSessionStore {
    pub fn new(user: SessionUser) -> Self {
        Self { user: Some(user) }
    }

    pub fn anonymous() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl SessionStore for StaticSessionStore {
    async fn current_user(&self) -> Option<SessionUser> {
        self.user.clone()
    }
}
