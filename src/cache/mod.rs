//! 缓存模块
//!
//! - **swr**: 过期可用缓存，TTL + 单飞加载 + 后台精炼
//! - **entry**: 缓存条目和新鲜度
//! - **policy**: 缓存配置和驱逐策略
//! - **event**: 订阅者收到的缓存事件
//! - **stats**: 命中率等统计信息

pub mod entry;
pub mod event;
pub mod policy;
pub mod stats;
pub mod swr;

pub use entry::{CacheEntry, Freshness, Lookup};
pub use event::CacheEvent;
pub use policy::{CacheConfig, EvictionPolicy};
pub use stats::{CacheStats, CacheStatsSnapshot};
pub use swr::{CacheResult, StaleWhileRevalidateCache};
