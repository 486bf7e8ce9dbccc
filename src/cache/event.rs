//! 缓存事件
//!
//! 通过 `tokio::sync::broadcast` 发给订阅者，精炼失败也只从这里和日志暴露。

use crate::error::CacheError;

#[derive(Debug, Clone)]
pub enum CacheEvent<K, V> {
    /// 主加载完成并写入缓存
    Loaded { key: K, value: V },
    /// 后台精炼成功并覆盖了缓存值
    Refined { key: K, value: V },
    /// 后台精炼失败，缓存值保持不变
    RefinementFailed { key: K, error: CacheError },
    Invalidated { key: K },
    /// 因容量限制被驱逐
    Evicted { key: K },
}

impl<K, V> CacheEvent<K, V> {
    pub fn key(&self) -> &K {
        match self {
            CacheEvent::Loaded { key, .. }
            | CacheEvent::Refined { key, .. }
            | CacheEvent::RefinementFailed { key, .. }
            | CacheEvent::Invalidated { key }
            | CacheEvent::Evicted { key } => key,
        }
    }
}
