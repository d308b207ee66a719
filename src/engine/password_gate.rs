// ==========================================
// 人事薪资后台 - 密码确认闸门
// ==========================================
// 职责: 破坏性操作前的密码复核 + 尝试次数上限
// 红线: 空输入不计次；达到上限后不再接受任何输入
// ==========================================

use crate::app::session::SessionUser;
use crate::domain::types::PasswordErrorKind;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordOutcome {
    Accepted,
    Rejected {
        kind: PasswordErrorKind,
        remaining: u8,
    },
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct PasswordGate {
    attempts: u8,
    max_attempts: u8,
}

impl PasswordGate {
    pub fn new(max_attempts: u8) -> Self {
        Self {
            attempts: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn attempts(&self) -> u8 {
        self.attempts
    }

    pub fn remaining(&self) -> u8 {
        self.max_attempts.saturating_sub(self.attempts)
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// 校验密码
    ///
    /// # 返回
    /// - Accepted: 摘要匹配
    /// - Rejected: 未输入（不计次）或不匹配（计次）
    /// - Exhausted: 本次失败后达到上限，或此前已达上限
    pub fn verify(&mut self, user: &SessionUser, password: &str) -> PasswordOutcome {
        if self.is_exhausted() {
            return PasswordOutcome::Exhausted;
        }

        if password.is_empty() {
            return PasswordOutcome::Rejected {
                kind: PasswordErrorKind::Required,
                remaining: self.remaining(),
            };
        }

        if user.verify_password(password) {
            debug!(user = %user.id, "密码确认通过");
            return PasswordOutcome::Accepted;
        }

        self.attempts += 1;
        warn!(user = %user.id, attempts = self.attempts, max = self.max_attempts, "密码确认失败");
        if self.is_exhausted() {
            PasswordOutcome::Exhausted
        } else {
            PasswordOutcome::Rejected {
                kind: PasswordErrorKind::Invalid,
                remaining: self.remaining(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> SessionUser {
        SessionUser::new("u1", "Ana", "segredo", "import")
    }

    #[test]
    fn test_empty_password_not_counted() {
        let mut gate = PasswordGate::new(3);
        assert_eq!(
            gate.verify(&user(), ""),
            PasswordOutcome::Rejected {
                kind: PasswordErrorKind::Required,
                remaining: 3
            }
        );
        assert_eq!(gate.attempts(), 0);
    }

    #[test]
    fn test_three_failures_exhaust() {
        let mut gate = PasswordGate::new(3);
        let u = user();
        assert_eq!(
            gate.verify(&u, "x"),
            PasswordOutcome::Rejected {
                kind: PasswordErrorKind::Invalid,
                remaining: 2
            }
        );
        assert!(matches!(gate.verify(&u, "y"), PasswordOutcome::Rejected { remaining: 1, .. }));
        assert_eq!(gate.verify(&u, "z"), PasswordOutcome::Exhausted);
        // 上限后正确密码也不再接受
        assert_eq!(gate.verify(&u, "segredo"), PasswordOutcome::Exhausted);
    }

    #[test]
    fn test_correct_password_after_failure() {
        let mut gate = PasswordGate::new(3);
        let u = user();
        gate.verify(&u, "x");
        assert_eq!(gate.verify(&u, "segredo"), PasswordOutcome::Accepted);
    }
}
