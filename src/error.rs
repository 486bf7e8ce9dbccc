//! 统一错误处理
//!
//! 提供缓存、翻译和酒店接口的结构化错误类型和错误处理机制

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// 加载器和精炼器返回的任意错误
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// 可在多个等待者之间共享的错误
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// 缓存错误类型
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// 主加载失败，所有等待同一个请求的调用方都会收到同一个错误
    #[error("加载失败: {0}")]
    LoadFailed(#[source] SharedError),

    /// 后台精炼失败，只会写入日志和事件通道
    #[error("精炼失败: {0}")]
    RefinementFailed(#[source] SharedError),

    /// 后台加载任务异常退出
    #[error("后台任务异常退出: {0}")]
    TaskFailed(String),

    /// 配置错误
    #[error("缓存配置错误: {0}")]
    Config(String),
}

impl CacheError {
    /// 包装加载器错误
    pub fn load_failed<E: Into<BoxError>>(cause: E) -> Self {
        CacheError::LoadFailed(Arc::from(cause.into()))
    }

    /// 包装精炼器错误
    pub fn refinement_failed<E: Into<BoxError>>(cause: E) -> Self {
        CacheError::RefinementFailed(Arc::from(cause.into()))
    }

    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            CacheError::LoadFailed(_) => true,
            CacheError::RefinementFailed(_) => true,
            CacheError::TaskFailed(_) => true,
            CacheError::Config(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CacheError::LoadFailed(_) => ErrorSeverity::Error,
            CacheError::RefinementFailed(_) => ErrorSeverity::Warning,
            CacheError::TaskFailed(_) => ErrorSeverity::Critical,
            CacheError::Config(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            CacheError::LoadFailed(_) => ErrorCategory::Load,
            CacheError::RefinementFailed(_) => ErrorCategory::Refinement,
            CacheError::TaskFailed(_) => ErrorCategory::Internal,
            CacheError::Config(_) => ErrorCategory::Configuration,
        }
    }
}

/// 翻译错误类型
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 网络错误
    #[error("网络错误: {0}")]
    Http(String),

    /// 翻译接口返回非成功状态
    #[error("翻译接口错误 ({status}): {message}")]
    Api { status: u16, message: String },

    /// 响应解析错误
    #[error("解析错误: {0}")]
    Decode(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),
}

impl TranslationError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::Http(_) => true,
            TranslationError::Api { status, .. } => *status >= 500 || *status == 429,
            TranslationError::Decode(_) => false,
            TranslationError::InvalidInput(_) => false,
            TranslationError::Config(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::Http(_) => ErrorSeverity::Warning,
            TranslationError::Api { .. } => ErrorSeverity::Warning,
            TranslationError::Decode(_) => ErrorSeverity::Error,
            TranslationError::InvalidInput(_) => ErrorSeverity::Info,
            TranslationError::Config(_) => ErrorSeverity::Critical,
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            TranslationError::Decode(error.to_string())
        } else {
            TranslationError::Http(error.to_string())
        }
    }
}

/// 翻译操作的结果类型
pub type TranslationResult<T> = Result<T, TranslationError>;

/// 酒店接口错误类型
#[derive(Error, Debug, Clone)]
pub enum HotelApiError {
    /// 网络错误
    #[error("网络错误: {0}")]
    Http(String),

    /// 接口返回非成功状态
    #[error("酒店接口错误 ({status}): {message}")]
    Api { status: u16, message: String },

    /// 响应中没有房间详情
    #[error("未找到房间详情: {0}")]
    NotFound(String),

    /// 响应解析错误
    #[error("解析错误: {0}")]
    Decode(String),
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for HotelApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            HotelApiError::Decode(error.to_string())
        } else {
            HotelApiError::Http(error.to_string())
        }
    }
}

impl From<serde_json::Error> for HotelApiError {
    fn from(error: serde_json::Error) -> Self {
        HotelApiError::Decode(format!("JSON解析错误: {}", error))
    }
}

/// 酒店接口操作的结果类型
pub type HotelApiResult<T> = Result<T, HotelApiError>;

/// 顶层错误类型
#[derive(Error, Debug)]
pub enum StayfreshError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(String),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    HotelApi(#[from] HotelApiError),
}

impl From<toml::de::Error> for StayfreshError {
    fn from(error: toml::de::Error) -> Self {
        StayfreshError::Parse(format!("TOML解析错误: {}", error))
    }
}

impl From<serde_json::Error> for StayfreshError {
    fn from(error: serde_json::Error) -> Self {
        StayfreshError::Parse(format!("JSON解析错误: {}", error))
    }
}

/// 顶层结果类型
pub type StayfreshResult<T> = Result<T, StayfreshError>;

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Load,
    Refinement,
    Internal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorSeverity::Info => "info",
            ErrorSeverity::Warning => "warning",
            ErrorSeverity::Error => "error",
            ErrorSeverity::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录缓存错误
    pub fn log_cache_error(error: &CacheError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("缓存信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("缓存警告: {}", error),
            ErrorSeverity::Error => tracing::error!("缓存错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("缓存严重错误: {}", error),
        }
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> StayfreshError {
        StayfreshError::Config(msg.to_string())
    }
}
