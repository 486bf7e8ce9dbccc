//! 翻译模块
//!
//! - **client**: `Translator` 接口和 LibreTranslate / MyMemory HTTP 客户端
//! - **service**: 带结果缓存和并发限制的翻译服务
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use stayfresh::config::TranslationSettings;
//! use stayfresh::translation::TranslationService;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = TranslationService::from_settings(&TranslationSettings::default())?;
//! let translated = service.translate_text("Free WiFi", "ar", "en").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod service;

pub use client::Translator;
#[cfg(feature = "http")]
pub use client::{LibreTranslateClient, MyMemoryClient};
pub use service::{api_language_code, generate_cache_key, TranslationService};
