//! 缓存条目

use std::time::Duration;

use tokio::time::Instant;

/// 缓存条目
///
/// 条目只能被整体替换，`stored_at` 来自 tokio 时钟，测试中可以暂停和快进。
#[derive(Debug, Clone)]
pub struct CacheEntry<K, V> {
    pub key: K,
    pub value: V,
    pub stored_at: Instant,
}

impl<K, V> CacheEntry<K, V> {
    /// 以当前时间创建条目
    pub fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            stored_at: Instant::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.stored_at)
    }

    /// `now - stored_at < ttl` 时条目是新鲜的
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

/// 条目新鲜度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

/// `peek` 的结果：当前能拿到的最好的值
#[derive(Debug, Clone)]
pub struct Lookup<V> {
    pub value: V,
    pub freshness: Freshness,
    pub age: Duration,
}

impl<V> Lookup<V> {
    pub fn is_fresh(&self) -> bool {
        self.freshness == Freshness::Fresh
    }
}
