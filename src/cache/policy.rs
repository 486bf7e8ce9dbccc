//! 缓存配置与驱逐策略

use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::config::constants;
use crate::error::CacheError;

/// 驱逐策略
///
/// 默认不限制条目数量，每个出现过的键都会保留到进程结束。
/// 需要限制内存时改用 `Lru`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvictionPolicy {
    #[default]
    Unbounded,
    /// 超过容量时驱逐最久未访问的条目
    Lru { capacity: usize },
}

impl EvictionPolicy {
    /// 根据最大条目数创建策略，0 表示不限制
    pub fn from_max_entries(max_entries: usize) -> Self {
        if max_entries == 0 {
            EvictionPolicy::Unbounded
        } else {
            EvictionPolicy::Lru {
                capacity: max_entries,
            }
        }
    }

    /// 创建对应的底层存储
    pub(crate) fn build_store<K, V>(&self) -> Result<LruCache<K, V>, CacheError>
    where
        K: std::hash::Hash + Eq,
    {
        match self {
            EvictionPolicy::Unbounded => Ok(LruCache::unbounded()),
            EvictionPolicy::Lru { capacity } => NonZeroUsize::new(*capacity)
                .map(LruCache::new)
                .ok_or_else(|| CacheError::Config("LRU容量不能为0".to_string())),
        }
    }
}

/// 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub eviction: EvictionPolicy,
    /// 事件通道容量，慢订阅者会丢失最旧的事件
    pub event_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: constants::DEFAULT_CACHE_TTL.as_secs(),
            eviction: EvictionPolicy::Unbounded,
            event_capacity: constants::DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// 创建指定TTL的配置
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl_secs: ttl.as_secs(),
            ..Self::default()
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// 验证配置
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.ttl_secs == 0 {
            return Err(CacheError::Config("TTL必须大于0".to_string()));
        }

        if let EvictionPolicy::Lru { capacity: 0 } = self.eviction {
            return Err(CacheError::Config("LRU容量不能为0".to_string()));
        }

        if self.event_capacity == 0 {
            return Err(CacheError::Config("事件通道容量不能为0".to_string()));
        }

        Ok(())
    }
}
