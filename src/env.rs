//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问，供配置管理器覆盖文件配置

use std::env;
use std::fmt;
use std::time::Duration;

use crate::config::TranslationProvider;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    /// 只在变量被显式设置时返回值，解析失败同样视为错误
    fn get_if_set() -> Option<EnvResult<T>> {
        env::var(Self::NAME).ok().map(|value| Self::parse(&value))
    }
}

/// 日志相关环境变量
pub mod logging {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "STAYFRESH_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("Invalid log level '{}'. Use: trace, debug, info, warn, error", value),
                }),
            }
        }
    }
}

/// 缓存相关环境变量
pub mod cache {
    use super::*;

    /// 缓存TTL
    pub struct Ttl;
    impl EnvVar<Duration> for Ttl {
        const NAME: &'static str = "STAYFRESH_CACHE_TTL";
        const DEFAULT: Option<Duration> = Some(Duration::from_secs(300));
        const DESCRIPTION: &'static str = "Cache TTL in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds: u64 = value.trim().parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: "Must be a valid number of seconds".to_string(),
            })?;

            if seconds == 0 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "TTL must be greater than 0".to_string(),
                });
            }

            if seconds > 86400 * 7 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "TTL too long (maximum 7 days)".to_string(),
                });
            }

            Ok(Duration::from_secs(seconds))
        }
    }

    /// 最大条目数，0 表示不限制
    pub struct MaxEntries;
    impl EnvVar<usize> for MaxEntries {
        const NAME: &'static str = "STAYFRESH_CACHE_MAX_ENTRIES";
        const DEFAULT: Option<usize> = Some(0);
        const DESCRIPTION: &'static str = "Maximum cached entries before LRU eviction (0 = unbounded)";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 0, 10_000_000)
        }
    }
}

/// 翻译相关环境变量
pub mod translation {
    use super::*;

    /// 翻译接口地址
    pub struct ApiUrl;
    impl EnvVar<String> for ApiUrl {
        const NAME: &'static str = "STAYFRESH_TRANSLATION_API_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Translation API endpoint URL";

        fn parse(value: &str) -> EnvResult<String> {
            parse_http_url(value, Self::NAME)
        }
    }

    /// 翻译服务提供方
    pub struct Provider;
    impl EnvVar<TranslationProvider> for Provider {
        const NAME: &'static str = "STAYFRESH_TRANSLATION_PROVIDER";
        const DEFAULT: Option<TranslationProvider> = Some(TranslationProvider::LibreTranslate);
        const DESCRIPTION: &'static str = "Translation backend: libretranslate, mymemory";

        fn parse(value: &str) -> EnvResult<TranslationProvider> {
            match value.trim().to_lowercase().as_str() {
                "libretranslate" | "libre" => Ok(TranslationProvider::LibreTranslate),
                "mymemory" => Ok(TranslationProvider::MyMemory),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("Invalid provider '{}'. Use: libretranslate, mymemory", value),
                }),
            }
        }
    }

    /// 最大并发请求数
    pub struct MaxConcurrent;
    impl EnvVar<usize> for MaxConcurrent {
        const NAME: &'static str = "STAYFRESH_TRANSLATION_MAX_CONCURRENT";
        const DEFAULT: Option<usize> = Some(8);
        const DESCRIPTION: &'static str = "Maximum concurrent requests to translation API";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 100)
        }
    }
}

/// 酒店接口相关环境变量
pub mod hotel {
    use super::*;

    /// 房间详情接口地址
    pub struct ApiUrl;
    impl EnvVar<String> for ApiUrl {
        const NAME: &'static str = "STAYFRESH_HOTEL_API_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Hotel room details endpoint URL";

        fn parse(value: &str) -> EnvResult<String> {
            parse_http_url(value, Self::NAME)
        }
    }

    /// 请求超时
    pub struct Timeout;
    impl EnvVar<Duration> for Timeout {
        const NAME: &'static str = "STAYFRESH_HOTEL_API_TIMEOUT";
        const DEFAULT: Option<Duration> = Some(Duration::from_secs(30));
        const DESCRIPTION: &'static str = "Hotel API request timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds = parse_positive_usize(value, Self::NAME, 1, 300)?;
            Ok(Duration::from_secs(seconds as u64))
        }
    }
}

/// 辅助函数
fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

fn parse_http_url(value: &str, var_name: &str) -> EnvResult<String> {
    let trimmed = value.trim();
    match url::Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(trimmed.to_string()),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: "URL must start with http:// or https://".to_string(),
        }),
    }
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables\n\n");

    docs.push_str(&format!("- `{}`: {}\n", logging::LogLevel::NAME, logging::LogLevel::DESCRIPTION));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        cache::Ttl::NAME,
        cache::Ttl::DESCRIPTION,
        cache::Ttl::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        cache::MaxEntries::NAME,
        cache::MaxEntries::DESCRIPTION,
        cache::MaxEntries::DEFAULT
    ));
    docs.push_str(&format!("- `{}`: {}\n", translation::ApiUrl::NAME, translation::ApiUrl::DESCRIPTION));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        translation::Provider::NAME,
        translation::Provider::DESCRIPTION,
        translation::Provider::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        translation::MaxConcurrent::NAME,
        translation::MaxConcurrent::DESCRIPTION,
        translation::MaxConcurrent::DEFAULT
    ));
    docs.push_str(&format!("- `{}`: {}\n", hotel::ApiUrl::NAME, hotel::ApiUrl::DESCRIPTION));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        hotel::Timeout::NAME,
        hotel::Timeout::DESCRIPTION,
        hotel::Timeout::DEFAULT
    ));

    docs
}
