//! 配置管理模块
//!
//! 提供简化的配置管理，支持配置文件、`.env` 文件、环境变量和默认值

pub mod manager;

pub use manager::{
    ConfigManager, HotelApiSettings, StayfreshConfig, TranslationProvider, TranslationSettings,
};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 缓存设置
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60); // 5分钟
    pub const DEFAULT_EVENT_CAPACITY: usize = 64;

    // 翻译设置
    pub const LIBRETRANSLATE_API_URL: &str = "https://libretranslate.com/translate";
    pub const MYMEMORY_API_URL: &str = "https://api.mymemory.translated.net/get";
    pub const DEFAULT_SOURCE_LANG: &str = "en";
    pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "ar", "fr"];
    pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;
    pub const DEFAULT_TRANSLATION_TIMEOUT: Duration = Duration::from_secs(15);

    // 酒店接口设置
    pub const DEFAULT_HOTEL_API_TIMEOUT: Duration = Duration::from_secs(30);
    pub const HOTEL_TRANSLATION_CHUNK: usize = 5;
    pub const HOTEL_TRANSLATION_DELAY: Duration = Duration::from_millis(100);

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "stayfresh.toml",
        ".stayfresh.toml",
        "stayfresh.json",
        "~/.config/stayfresh/config.toml",
    ];

    pub const ENV_FILES: &[&str] = &[".env.local", ".env"];
}

/// 加载配置，失败时使用默认配置
pub fn load_config() -> StayfreshConfig {
    match ConfigManager::new() {
        Ok(manager) => manager.into_config(),
        Err(e) => {
            tracing::warn!("配置加载失败，使用默认配置: {}", e);
            StayfreshConfig::default()
        }
    }
}
