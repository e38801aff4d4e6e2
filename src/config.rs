use serde::Deserialize;

use crate::error::{AppResult, ConfigError};
use crate::models::Role;

/// 会话配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 考试门户 API 地址
    pub api_base_url: String,
    /// 门户鉴权 token（随所有请求发送）
    pub portal_token: String,
    /// 考试ID
    pub test_id: String,
    /// 用户ID
    pub user_id: String,
    /// 本次考试实例ID
    pub user_test_id: String,
    /// 用户角色（决定考后跳转）
    pub role: Role,
    /// 是否启用音视频采集
    pub capture_enabled: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://tps-exam-api.staff.xdf.cn".to_string(),
            portal_token: "9A1C4E7702B3D8F06145C2AB88E0D9F3".to_string(),
            test_id: String::new(),
            user_id: String::new(),
            user_test_id: String::new(),
            role: Role::Student,
            capture_enabled: false,
            verbose_logging: false,
            request_timeout_secs: 15,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_base_url: std::env::var("EXAM_API_BASE_URL").unwrap_or(default.api_base_url),
            portal_token: std::env::var("EXAM_PORTAL_TOKEN").unwrap_or(default.portal_token),
            test_id: std::env::var("EXAM_TEST_ID").unwrap_or(default.test_id),
            user_id: std::env::var("EXAM_USER_ID").unwrap_or(default.user_id),
            user_test_id: std::env::var("EXAM_USER_TEST_ID").unwrap_or(default.user_test_id),
            role: std::env::var("EXAM_ROLE").ok().and_then(|v| Role::from_str(&v)).unwrap_or(default.role),
            capture_enabled: std::env::var("EXAM_CAPTURE_ENABLED").ok().and_then(|v| v.parse().ok()).unwrap_or(default.capture_enabled),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
        }
    }

    /// 从 TOML 文件加载配置
    ///
    /// 文件中缺省的字段回落到默认值。
    pub fn from_toml_file(path: &str) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadFailed {
            path: path.to_string(),
            source: Box::new(e),
        }).map_err(crate::error::AppError::Config)?;

        let file: ConfigFile = toml::from_str(&raw).map_err(|e| ConfigError::TomlParseFailed {
            path: path.to_string(),
            source: Box::new(e),
        }).map_err(crate::error::AppError::Config)?;

        let default = Self::default();
        Ok(Self {
            api_base_url: file.api_base_url.unwrap_or(default.api_base_url),
            portal_token: file.portal_token.unwrap_or(default.portal_token),
            test_id: file.test_id.unwrap_or(default.test_id),
            user_id: file.user_id.unwrap_or(default.user_id),
            user_test_id: file.user_test_id.unwrap_or(default.user_test_id),
            role: file.role.as_deref().and_then(Role::from_str).unwrap_or(default.role),
            capture_enabled: file.capture_enabled.unwrap_or(default.capture_enabled),
            verbose_logging: file.verbose_logging.unwrap_or(default.verbose_logging),
            request_timeout_secs: file.request_timeout_secs.unwrap_or(default.request_timeout_secs),
        })
    }

    /// 校验配置是否可以开考
    ///
    /// 缺少考试ID或用户身份属于致命配置错误，直接拒绝进入会话。
    pub fn validate(&self) -> AppResult<()> {
        if self.test_id.trim().is_empty() {
            return Err(crate::error::AppError::Config(ConfigError::MissingTestId));
        }
        if self.user_id.trim().is_empty() || self.user_test_id.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                ConfigError::MissingUserIdentity,
            ));
        }
        Ok(())
    }
}

/// TOML 配置文件结构（字段全部可选）
#[derive(Debug, Deserialize)]
struct ConfigFile {
    api_base_url: Option<String>,
    portal_token: Option<String>,
    test_id: Option<String>,
    user_id: Option<String>,
    user_test_id: Option<String>,
    role: Option<String>,
    capture_enabled: Option<bool>,
    verbose_logging: Option<bool>,
    request_timeout_secs: Option<u64>,
}
