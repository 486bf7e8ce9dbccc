//! 日志初始化

use tracing_subscriber::EnvFilter;

use crate::config::StayfreshConfig;
use crate::env::{logging::LogLevel, EnvVar};

/// 安装全局 `tracing` 订阅者
///
/// `RUST_LOG` 优先；否则使用 `STAYFRESH_LOG_LEVEL`，再否则使用 `default_level`。
/// 已经安装过订阅者时返回 `false`。
pub fn init_tracing(default_level: &str) -> bool {
    let level = LogLevel::get_if_set()
        .and_then(Result::ok)
        .unwrap_or_else(|| default_level.to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("stayfresh={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// 按配置中的 `log_level` 安装订阅者
///
/// `ConfigManager` 已把 `STAYFRESH_LOG_LEVEL` 合并进配置，`RUST_LOG` 仍然优先。
pub fn init_from_config(config: &StayfreshConfig) -> bool {
    init_tracing(&config.log_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        init_tracing("debug");
        assert!(!init_tracing("debug"));

        let config = StayfreshConfig {
            log_level: "warn".to_string(),
            ..StayfreshConfig::default()
        };
        assert!(!init_from_config(&config));
    }
}
