//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::cache::{CacheConfig, EvictionPolicy};
use crate::env::{self, EnvVar};
use crate::error::{StayfreshError, StayfreshResult};

/// 翻译服务提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    #[default]
    LibreTranslate,
    MyMemory,
}

impl TranslationProvider {
    pub fn default_api_url(&self) -> &'static str {
        match self {
            TranslationProvider::LibreTranslate => constants::LIBRETRANSLATE_API_URL,
            TranslationProvider::MyMemory => constants::MYMEMORY_API_URL,
        }
    }
}

/// 翻译配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationSettings {
    pub enabled: bool,
    pub provider: TranslationProvider,
    /// 为空时使用提供方的默认地址
    pub api_url: Option<String>,
    pub source_lang: String,
    pub max_concurrent_requests: usize,
    pub timeout_secs: u64,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: TranslationProvider::default(),
            api_url: None,
            source_lang: constants::DEFAULT_SOURCE_LANG.to_string(),
            max_concurrent_requests: constants::DEFAULT_MAX_CONCURRENT_REQUESTS,
            timeout_secs: constants::DEFAULT_TRANSLATION_TIMEOUT.as_secs(),
        }
    }
}

impl TranslationSettings {
    pub fn api_url(&self) -> &str {
        self.api_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_url())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 酒店接口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotelApiSettings {
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for HotelApiSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: constants::DEFAULT_HOTEL_API_TIMEOUT.as_secs(),
        }
    }
}

impl HotelApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 完整配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StayfreshConfig {
    pub log_level: String,
    pub cache: CacheConfig,
    pub translation: TranslationSettings,
    pub hotel_api: HotelApiSettings,
}

impl Default for StayfreshConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            cache: CacheConfig::default(),
            translation: TranslationSettings::default(),
            hotel_api: HotelApiSettings::default(),
        }
    }
}

impl StayfreshConfig {
    /// 验证配置
    pub fn validate(&self) -> StayfreshResult<()> {
        self.cache.validate()?;

        if self.translation.max_concurrent_requests == 0 {
            return Err(StayfreshError::Config("最大并发数不能为0".to_string()));
        }

        if self.translation.timeout_secs == 0 || self.hotel_api.timeout_secs == 0 {
            return Err(StayfreshError::Config("请求超时必须大于0".to_string()));
        }

        validate_url(self.translation.api_url(), "translation.api_url")?;
        if let Some(base_url) = &self.hotel_api.base_url {
            validate_url(base_url, "hotel_api.base_url")?;
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    ///
    /// 只处理显式设置的变量；无法解析的值会被记录并忽略。
    pub fn apply_env_overrides(&mut self) {
        if let Some(level) = override_value::<env::logging::LogLevel, _>() {
            self.log_level = level;
        }

        if let Some(ttl) = override_value::<env::cache::Ttl, _>() {
            self.cache.ttl_secs = ttl.as_secs();
        }

        if let Some(max_entries) = override_value::<env::cache::MaxEntries, _>() {
            self.cache.eviction = EvictionPolicy::from_max_entries(max_entries);
        }

        if let Some(provider) = override_value::<env::translation::Provider, _>() {
            self.translation.provider = provider;
        }

        if let Some(api_url) = override_value::<env::translation::ApiUrl, _>() {
            tracing::info!("环境变量覆盖翻译 API URL: {}", api_url);
            self.translation.api_url = Some(api_url);
        }

        if let Some(max_concurrent) = override_value::<env::translation::MaxConcurrent, _>() {
            self.translation.max_concurrent_requests = max_concurrent;
        }

        if let Some(base_url) = override_value::<env::hotel::ApiUrl, _>() {
            self.hotel_api.base_url = Some(base_url);
        }

        if let Some(timeout) = override_value::<env::hotel::Timeout, _>() {
            self.hotel_api.timeout_secs = timeout.as_secs();
        }
    }
}

fn override_value<E: EnvVar<T>, T>() -> Option<T> {
    match E::get_if_set()? {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("忽略无效的环境变量: {}", e);
            None
        }
    }
}

fn validate_url(value: &str, field: &str) -> StayfreshResult<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| StayfreshError::Config(format!("{} 无效: {}", field, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(StayfreshError::Config(format!(
            "{} 必须以 http:// 或 https:// 开头",
            field
        )));
    }
    Ok(())
}

/// 简化的配置管理器
pub struct ConfigManager {
    config: StayfreshConfig,
}

impl ConfigManager {
    /// 创建新的配置管理器：`.env` -> 配置文件 -> 环境变量覆盖 -> 验证
    pub fn new() -> StayfreshResult<Self> {
        Self::load_dotenv();
        Self::with_config(Self::discover_config()?)
    }

    /// 从已有配置创建，应用环境变量覆盖并验证
    pub fn with_config(mut config: StayfreshConfig) -> StayfreshResult<Self> {
        config.apply_env_overrides();
        config.validate()?;
        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &StayfreshConfig {
        &self.config
    }

    pub fn into_config(self) -> StayfreshConfig {
        self.config
    }

    /// 按搜索路径查找配置文件
    fn discover_config() -> StayfreshResult<StayfreshConfig> {
        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(expanded_path.as_ref());
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(StayfreshConfig::default())
    }

    /// 从指定文件加载配置，`.json` 按JSON解析，其余按TOML解析
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> StayfreshResult<StayfreshConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        for env_file in constants::ENV_FILES {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件，文件头以注释列出可用的环境变量
    pub fn generate_example_config<P: AsRef<Path>>(path: P) -> StayfreshResult<()> {
        let config = StayfreshConfig::default();
        let body = toml::to_string_pretty(&config)
            .map_err(|e| StayfreshError::Config(format!("序列化配置失败: {}", e)))?;

        let mut content = String::new();
        for line in env::generate_env_docs().lines() {
            let line = line.trim_start_matches("# ");
            if line.is_empty() {
                content.push_str("#\n");
            } else {
                content.push_str(&format!("# {}\n", line));
            }
        }
        content.push('\n');
        content.push_str(&body);

        std::fs::write(path, content)?;
        Ok(())
    }
}
