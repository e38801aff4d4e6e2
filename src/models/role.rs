use serde::{Deserialize, Serialize};

/// 用户角色
///
/// 决定考后跳转目标以及统计上报失败时的兜底路径。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// 考生
    Student,
    /// 管理员
    Admin,
}

impl Role {
    /// 尝试从字符串解析角色（大小写不敏感）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" | "candidate" => Some(Role::Student),
            "admin" | "administrator" => Some(Role::Admin),
            _ => None,
        }
    }

    /// 标准名称
    pub fn name(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!(Role::from_str("Admin"), Some(Role::Admin));
        assert_eq!(Role::from_str(" STUDENT "), Some(Role::Student));
        assert_eq!(Role::from_str("proctor"), None);
    }
}
