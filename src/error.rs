use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 配置错误（缺少考试/用户标识等，不可恢复）
    Config(ConfigError),
    /// API 调用错误
    Api(ApiError),
    /// 交卷提交错误（可恢复，允许重试）
    Submission(SubmissionError),
    /// 音视频采集错误（不致命，仅记录）
    Capture(CaptureError),
    /// 业务逻辑错误
    Business(BusinessError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Api(e) => write!(f, "API错误: {}", e),
            AppError::Submission(e) => write!(f, "提交错误: {}", e),
            AppError::Capture(e) => write!(f, "采集错误: {}", e),
            AppError::Business(e) => write!(f, "业务错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::Api(e) => Some(e),
            AppError::Submission(e) => Some(e),
            AppError::Capture(e) => Some(e),
            AppError::Business(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 缺少考试标识
    MissingTestId,
    /// 缺少用户身份（userId / userTestId）
    MissingUserIdentity,
    /// 读取配置文件失败
    FileReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingTestId => write!(f, "考试ID不能为空"),
            ConfigError::MissingUserIdentity => {
                write!(f, "用户身份不完整 (userId / userTestId)")
            }
            ConfigError::FileReadFailed { path, source } => {
                write!(f, "读取配置文件失败 ({}): {}", path, source)
            }
            ConfigError::TomlParseFailed { path, source } => {
                write!(f, "TOML解析失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::FileReadFailed { source, .. }
            | ConfigError::TomlParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// API 调用错误
#[derive(Debug)]
pub enum ApiError {
    /// 网络请求失败
    RequestFailed {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 非 2xx 状态码
    BadStatus {
        endpoint: String,
        status: u16,
    },
    /// 应用层返回失败（success=false 或 data 为空）
    BadEnvelope {
        endpoint: String,
        message: Option<String>,
    },
    /// JSON 解析失败
    JsonParseFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::RequestFailed { endpoint, source } => {
                write!(f, "API请求失败 ({}): {}", endpoint, source)
            }
            ApiError::BadStatus { endpoint, status } => {
                write!(f, "API返回异常状态码 ({}): {}", endpoint, status)
            }
            ApiError::BadEnvelope { endpoint, message } => {
                write!(f, "API返回失败响应 ({}): message={:?}", endpoint, message)
            }
            ApiError::JsonParseFailed { source } => {
                write!(f, "JSON解析失败: {}", source)
            }
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::RequestFailed { source, .. } | ApiError::JsonParseFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 交卷提交错误
///
/// 这一类错误是可恢复的：提交守卫会清除"进行中"标记，
/// 科目保持未提交状态，等待下一次触发重试。
#[derive(Debug)]
pub enum SubmissionError {
    /// 网络层失败
    Network {
        subject_id: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 服务端拒绝（非 2xx 或 success=false）
    Rejected {
        subject_id: String,
        message: Option<String>,
    },
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionError::Network { subject_id, source } => {
                write!(f, "科目 {} 提交网络失败: {}", subject_id, source)
            }
            SubmissionError::Rejected {
                subject_id,
                message,
            } => {
                write!(f, "科目 {} 提交被拒绝: {:?}", subject_id, message)
            }
        }
    }
}

impl std::error::Error for SubmissionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SubmissionError::Network { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 音视频采集错误
#[derive(Debug)]
pub enum CaptureError {
    /// 采集设备不可用
    DeviceUnavailable {
        detail: String,
    },
    /// 打包（压缩）失败
    PackagingFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 上传失败
    UploadFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::DeviceUnavailable { detail } => {
                write!(f, "采集设备不可用: {}", detail)
            }
            CaptureError::PackagingFailed { source } => {
                write!(f, "录制数据打包失败: {}", source)
            }
            CaptureError::UploadFailed { source } => {
                write!(f, "录制数据上传失败: {}", source)
            }
        }
    }
}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptureError::PackagingFailed { source } | CaptureError::UploadFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 业务逻辑错误
#[derive(Debug)]
pub enum BusinessError {
    /// 考试没有任何科目
    EmptySectionList,
    /// 科目索引超出范围
    SectionIndexOutOfRange {
        index: usize,
        max_index: usize,
    },
    /// 计时器状态非法（例如对非 Idle 状态调用 start）
    InvalidTimerState {
        expected: &'static str,
        actual: &'static str,
    },
    /// 会话已被销毁
    SessionTornDown,
}

impl fmt::Display for BusinessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusinessError::EmptySectionList => write!(f, "考试科目列表为空"),
            BusinessError::SectionIndexOutOfRange { index, max_index } => {
                write!(f, "科目索引 {} 超出范围 [0, {}]", index, max_index)
            }
            BusinessError::InvalidTimerState { expected, actual } => {
                write!(f, "计时器状态非法: 期望 {}, 实际 {}", expected, actual)
            }
            BusinessError::SessionTornDown => write!(f, "会话已销毁，拒绝继续操作"),
        }
    }
}

impl std::error::Error for BusinessError {}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        AppError::Api(ApiError::RequestFailed {
            endpoint,
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed {
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Other(format!("IO错误: {}", err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误
    pub fn api_request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建提交被拒绝错误
    pub fn submission_rejected(
        subject_id: impl Into<String>,
        message: Option<String>,
    ) -> Self {
        AppError::Submission(SubmissionError::Rejected {
            subject_id: subject_id.into(),
            message,
        })
    }

    /// 创建提交网络失败错误
    pub fn submission_network(
        subject_id: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Submission(SubmissionError::Network {
            subject_id: subject_id.into(),
            source: Box::new(source),
        })
    }

    /// 创建采集设备不可用错误
    pub fn capture_unavailable(detail: impl Into<String>) -> Self {
        AppError::Capture(CaptureError::DeviceUnavailable {
            detail: detail.into(),
        })
    }

    /// 判断是否属于可恢复的提交错误
    pub fn is_recoverable_submission(&self) -> bool {
        matches!(self, AppError::Submission(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
