//! 缓存统计信息
//!
//! 进程内原子计数器，同时向 `metrics` 门面上报同名计数。

use std::sync::atomic::{AtomicU64, Ordering};

/// 线程安全的缓存统计
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
    refinements: AtomicU64,
    refinement_failures: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("stayfresh_cache_hits_total").increment(1);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("stayfresh_cache_misses_total").increment(1);
    }

    /// 调用方加入了已有的在途请求
    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("stayfresh_cache_coalesced_total").increment(1);
    }

    pub fn record_load(&self, success: bool) {
        self.loads.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.load_failures.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("stayfresh_cache_load_failures_total").increment(1);
        }
    }

    pub fn record_refinement(&self, success: bool) {
        self.refinements.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.refinement_failures.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("stayfresh_cache_refinement_failures_total").increment(1);
        }
    }

    pub fn record_evictions(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.evictions.fetch_add(count, Ordering::Relaxed);
        metrics::counter!("stayfresh_cache_evictions_total").increment(count);
    }

    /// 获取统计快照
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            refinements: self.refinements.load(Ordering::Relaxed),
            refinement_failures: self.refinement_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// 统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub loads: u64,
    pub load_failures: u64,
    pub refinements: u64,
    pub refinement_failures: u64,
    pub evictions: u64,
}

impl CacheStatsSnapshot {
    /// 计算缓存命中率
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
