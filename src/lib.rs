//! # Stayfresh
//!
//! 酒店预订前端使用的过期可用（stale-while-revalidate）缓存。
//!
//! ## 模块组织
//!
//! - `cache` - 带TTL、单飞加载和后台精炼的缓存
//! - `error` - 统一错误类型
//! - `config` - 配置文件、`.env` 和默认值
//! - `env` - 类型化的环境变量
//! - `logging` - tracing 初始化
//! - `translation` - 文本翻译服务
//! - `hotel` - 房间详情的获取、缓存和翻译
//!
//! ## 示例
//!
//! ```rust
//! use std::time::Duration;
//! use stayfresh::cache::StaleWhileRevalidateCache;
//! use stayfresh::error::BoxError;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = StaleWhileRevalidateCache::new(Duration::from_secs(300));
//! let value = cache
//!     .fetch("HDS123".to_string(), || async { Ok::<_, BoxError>("Deluxe Room".to_string()) })
//!     .await?;
//! assert_eq!(cache.get(&"HDS123".to_string()), Some(value));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod env;
pub mod error;
pub mod hotel;
pub mod logging;
pub mod translation;

pub use cache::{CacheEvent, StaleWhileRevalidateCache};
pub use error::{CacheError, StayfreshError, StayfreshResult};
