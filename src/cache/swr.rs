//! 过期可用（stale-while-revalidate）缓存
//!
//! 按键缓存值，并提供：
//!
//! - **TTL过期**: `now - stored_at < ttl` 的条目才算新鲜
//! - **单飞加载**: 同一个键同时只会有一个主加载在途，后来的调用方等待同一个结果
//! - **后台精炼**: 值已经可见之后，再异步改进它（例如翻译），失败不会影响已有的值
//!
//! 主加载和精炼都在独立的 tokio 任务中执行，调用方放弃等待不会取消它们。

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::entry::{CacheEntry, Freshness, Lookup};
use super::event::CacheEvent;
use super::policy::{CacheConfig, EvictionPolicy};
use super::stats::{CacheStats, CacheStatsSnapshot};
use crate::config::constants;
use crate::error::{helpers, BoxError, CacheError};

/// 缓存操作的结果类型
pub type CacheResult<T> = Result<T, CacheError>;

type PendingLoad<V> = Shared<BoxFuture<'static, CacheResult<V>>>;

/// 调试构建下记录当前线程正在调用哪个缓存的 `loader`
#[cfg(debug_assertions)]
mod reentrancy {
    use std::cell::Cell;

    thread_local! {
        static ACTIVE: Cell<usize> = const { Cell::new(0) };
    }

    pub(super) struct Scope(usize);

    impl Scope {
        pub(super) fn enter(owner: usize) -> Self {
            Scope(ACTIVE.with(|active| active.replace(owner)))
        }
    }

    impl Drop for Scope {
        fn drop(&mut self) {
            ACTIVE.with(|active| active.set(self.0));
        }
    }

    pub(super) fn is_active(owner: usize) -> bool {
        ACTIVE.with(|active| active.get() == owner)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("加载任务panic: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("加载任务panic: {}", message)
    } else {
        "加载任务panic".to_string()
    }
}

struct State<K, V> {
    entries: LruCache<K, CacheEntry<K, V>>,
    in_flight: HashMap<K, PendingLoad<V>>,
}

impl<K, V> State<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn fresh_value(&mut self, key: &K, ttl: Duration) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh(ttl))
            .map(|entry| entry.value.clone())
    }

    /// 写入条目，返回因容量被驱逐的键
    fn store(&mut self, key: K, value: V) -> Option<K> {
        let entry = CacheEntry::new(key.clone(), value);
        match self.entries.push(key.clone(), entry) {
            Some((old_key, _)) if old_key != key => Some(old_key),
            _ => None,
        }
    }
}

struct Inner<K, V> {
    ttl: Duration,
    state: Mutex<State<K, V>>,
    stats: CacheStats,
    events: broadcast::Sender<CacheEvent<K, V>>,
}

impl<K, V> Inner<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn lock(&self) -> MutexGuard<'_, State<K, V>> {
        // 同一线程重复加锁会死锁
        #[cfg(debug_assertions)]
        debug_assert!(!reentrancy::is_active(self.id()), "加载器内不能访问同一个缓存");

        // `loader` 在锁内调用，可能panic；中毒时继续使用内部状态
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(debug_assertions)]
    fn id(&self) -> usize {
        self as *const Self as usize
    }

    fn publish(&self, event: CacheEvent<K, V>) {
        // 没有订阅者时发送会失败，忽略即可
        let _ = self.events.send(event);
    }

    fn store(&self, key: K, value: V) {
        let evicted = self.lock().store(key, value);
        self.note_eviction(evicted);
    }

    fn note_eviction(&self, evicted: Option<K>) {
        if let Some(evicted_key) = evicted {
            self.stats.record_evictions(1);
            debug!(key = ?evicted_key, "容量已满，驱逐最久未使用的条目");
            self.publish(CacheEvent::Evicted { key: evicted_key });
        }
    }

    fn settle_load(&self, key: K, result: &CacheResult<V>) {
        // 移除在途标记和写入条目在同一把锁内完成
        let evicted = {
            let mut state = self.lock();
            state.in_flight.remove(&key);
            match result {
                Ok(value) => state.store(key.clone(), value.clone()),
                Err(_) => None,
            }
        };
        self.stats.record_load(result.is_ok());
        self.note_eviction(evicted);

        match result {
            Ok(value) => {
                debug!(key = ?key, "主加载完成");
                self.publish(CacheEvent::Loaded {
                    key,
                    value: value.clone(),
                });
            }
            Err(error) => {
                debug!(key = ?key, error = %error, "主加载失败，缓存保持不变");
            }
        }
    }

    fn settle_refinement(&self, key: K, result: Result<V, BoxError>) {
        match result {
            Ok(value) => {
                self.stats.record_refinement(true);
                debug!(key = ?key, "后台精炼完成");
                self.store(key.clone(), value.clone());
                self.publish(CacheEvent::Refined { key, value });
            }
            Err(cause) => {
                self.stats.record_refinement(false);
                let error = CacheError::refinement_failed(cause);
                helpers::log_cache_error(&error);
                self.publish(CacheEvent::RefinementFailed { key, error });
            }
        }
    }
}

/// 过期可用缓存
///
/// 克隆开销很小，所有克隆共享同一份状态。每个实例相互独立，
/// 没有进程级的全局缓存。
pub struct StaleWhileRevalidateCache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for StaleWhileRevalidateCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> StaleWhileRevalidateCache<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// 创建不限容量的缓存
    pub fn new(ttl: Duration) -> Self {
        Self::build(
            ttl,
            LruCache::unbounded(),
            constants::DEFAULT_EVENT_CAPACITY,
        )
    }

    /// 使用配置创建缓存
    pub fn with_config(config: &CacheConfig) -> CacheResult<Self> {
        config.validate()?;
        let entries = config.eviction.build_store()?;
        Ok(Self::build(config.ttl(), entries, config.event_capacity))
    }

    /// 使用指定TTL和驱逐策略创建缓存
    pub fn with_policy(ttl: Duration, policy: EvictionPolicy) -> CacheResult<Self> {
        let entries = policy.build_store()?;
        Ok(Self::build(ttl, entries, constants::DEFAULT_EVENT_CAPACITY))
    }

    fn build(ttl: Duration, entries: LruCache<K, CacheEntry<K, V>>, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                ttl,
                state: Mutex::new(State {
                    entries,
                    in_flight: HashMap::new(),
                }),
                stats: CacheStats::default(),
                events,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// 获取新鲜的缓存值，不做任何IO
    pub fn get(&self, key: &K) -> Option<V> {
        let value = self.inner.lock().fresh_value(key, self.inner.ttl);
        match value {
            Some(_) => self.inner.stats.record_hit(),
            None => self.inner.stats.record_miss(),
        }
        value
    }

    /// 获取当前能拿到的最好的值，过期的值也会返回并标记为 `Stale`
    pub fn lookup(&self, key: &K) -> Option<Lookup<V>> {
        let mut state = self.inner.lock();
        let entry = state.entries.get(key)?;
        let age = entry.age();
        let freshness = if age < self.inner.ttl {
            Freshness::Fresh
        } else {
            Freshness::Stale
        };
        Some(Lookup {
            value: entry.value.clone(),
            freshness,
            age,
        })
    }

    /// 获取值，必要时通过 `loader` 加载
    ///
    /// - 有新鲜条目时直接返回，不调用 `loader`
    /// - 同一个键已有在途请求时，等待该请求的结果，不调用 `loader`
    /// - 否则调用 `loader` 并登记为在途请求；无论成功失败，结束时都会移除在途标记
    ///
    /// 加载失败时所有等待者都会收到同一个 `CacheError::LoadFailed`，
    /// 已有的缓存条目保持不变，下一次调用会重新加载。
    ///
    /// `loader` 返回的 future panic 时，等待者收到 `CacheError::TaskFailed`，
    /// 在途标记同样会被移除。
    ///
    /// # Panics
    ///
    /// 加载任务通过 `tokio::spawn` 启动，需要在 tokio 运行时内轮询。
    ///
    /// `loader` 在内部锁内被调用，只应构造 future，不能在其中访问同一个缓存，
    /// 否则会死锁；调试构建下会直接panic。
    pub async fn fetch<F, Fut, E>(&self, key: K, loader: F) -> CacheResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let pending = {
            let mut state = self.inner.lock();

            if let Some(value) = state.fresh_value(&key, self.inner.ttl) {
                self.inner.stats.record_hit();
                trace!(key = ?key, "缓存命中");
                return Ok(value);
            }
            self.inner.stats.record_miss();

            if let Some(pending) = state.in_flight.get(&key) {
                self.inner.stats.record_coalesced();
                debug!(key = ?key, "请求已在途，等待同一个结果");
                pending.clone()
            } else {
                let load = {
                    #[cfg(debug_assertions)]
                    let _scope = reentrancy::Scope::enter(self.inner.id());
                    loader()
                };
                let pending = self.spawn_load(key.clone(), load);
                state.in_flight.insert(key, pending.clone());
                pending
            }
        };

        pending.await
    }

    fn spawn_load<Fut, E>(&self, key: K, load: Fut) -> PendingLoad<V>
    where
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let result = match AssertUnwindSafe(load).catch_unwind().await {
                Ok(outcome) => outcome.map_err(CacheError::load_failed),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(key = ?task_key, "{}", message);
                    Err(CacheError::TaskFailed(message))
                }
            };
            inner.settle_load(task_key, &result);
            result
        });

        let inner = Arc::clone(&self.inner);
        async move {
            match handle.await {
                Ok(result) => result,
                Err(join_error) => {
                    // 任务被取消（例如运行时关闭），没有走到结算，这里补上移除在途标记
                    inner.lock().in_flight.remove(&key);
                    inner.stats.record_load(false);
                    Err(CacheError::TaskFailed(join_error.to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// 后台精炼缓存值
    ///
    /// 对当前缓存值（过期的也算）调用 `refiner`，在独立任务中等待结果。
    /// 成功时覆盖条目并通知订阅者；失败时条目不变，错误只写入日志和事件通道。
    /// 没有可精炼的值时返回 `None`。返回的句柄可以直接丢弃。
    ///
    /// # Panics
    ///
    /// 有值可精炼时会调用 `tokio::spawn`，必须在 tokio 运行时内调用。
    pub fn refine<F, Fut, E>(&self, key: K, refiner: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce(V) -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let current = self
            .inner
            .lock()
            .entries
            .peek(&key)
            .map(|entry| entry.value.clone());

        let Some(current) = current else {
            trace!(key = ?key, "没有可精炼的值");
            return None;
        };

        let refinement = refiner(current);
        let inner = Arc::clone(&self.inner);
        Some(tokio::spawn(async move {
            let result = refinement.await.map_err(Into::into);
            inner.settle_refinement(key, result);
        }))
    }

    /// 直接写入值
    pub fn insert(&self, key: K, value: V) {
        self.inner.store(key, value);
    }

    /// 移除缓存条目，不取消在途请求
    pub fn invalidate(&self, key: &K) -> bool {
        let removed = self.inner.lock().entries.pop(key).is_some();
        if removed {
            debug!(key = ?key, "缓存条目已失效");
            self.inner.publish(CacheEvent::Invalidated { key: key.clone() });
        }
        removed
    }

    /// 清理过期条目
    pub fn cleanup_expired(&self) -> usize {
        let ttl = self.inner.ttl;
        let mut state = self.inner.lock();
        let expired: Vec<K> = state
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_fresh(ttl))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.entries.pop(key);
        }

        if !expired.is_empty() {
            debug!(count = expired.len(), "已清理过期条目");
        }
        expired.len()
    }

    /// 清空缓存条目，在途请求不受影响
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.inner.lock().in_flight.contains_key(key)
    }

    /// 订阅缓存事件
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent<K, V>> {
        self.inner.events.subscribe()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.inner.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache() -> StaleWhileRevalidateCache<String, u32> {
        StaleWhileRevalidateCache::new(Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_fetch_then_get() {
        let cache = cache();
        assert_eq!(cache.get(&"a".to_string()), None);

        let value = cache
            .fetch("a".to_string(), || async { Ok::<_, BoxError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(cache.get(&"a".to_string()), Some(7));
        assert!(!cache.is_in_flight(&"a".to_string()));
    }

    #[tokio::test]
    async fn test_fresh_entry_skips_loader() {
        let cache = cache();
        cache.insert("a".to_string(), 1);

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let value = cache
            .fetch("a".to_string(), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, BoxError>(2) }
            })
            .await
            .unwrap();

        assert_eq!(value, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_load_failure_leaves_entry_unchanged() {
        let cache = cache();
        cache.insert("a".to_string(), 1);
        cache.invalidate(&"a".to_string());

        let result = cache
            .fetch("a".to_string(), || async { Err::<u32, _>("boom") })
            .await;
        assert!(matches!(result, Err(CacheError::LoadFailed(_))));
        assert_eq!(cache.len(), 0);
        assert!(!cache.is_in_flight(&"a".to_string()));
        assert_eq!(cache.stats().load_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_reports_stale_values() {
        let cache = cache();
        cache.insert("a".to_string(), 5);

        let lookup = cache.lookup(&"a".to_string()).unwrap();
        assert!(lookup.is_fresh());

        tokio::time::advance(Duration::from_secs(61)).await;
        let lookup = cache.lookup(&"a".to_string()).unwrap();
        assert_eq!(lookup.freshness, Freshness::Stale);
        assert_eq!(lookup.value, 5);
        assert_eq!(cache.get(&"a".to_string()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_expired() {
        let cache = cache();
        cache.insert("old".to_string(), 1);
        tokio::time::advance(Duration::from_secs(30)).await;
        cache.insert("new".to_string(), 2);
        tokio::time::advance(Duration::from_secs(31)).await;

        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"new".to_string()), Some(2));
    }

    #[tokio::test]
    async fn test_refine_without_value_is_noop() {
        let cache = cache();
        let handle = cache.refine("missing".to_string(), |v| async move { Ok::<_, BoxError>(v + 1) });
        assert!(handle.is_none());
    }

    #[tokio::test]
    async fn test_panicking_load_reports_task_failed() {
        let cache = cache();
        let result = cache
            .fetch("a".to_string(), || async {
                if true {
                    panic!("upstream exploded");
                }
                Ok::<u32, BoxError>(1)
            })
            .await;

        match result {
            Err(CacheError::TaskFailed(message)) => assert!(message.contains("upstream exploded")),
            other => panic!("expected TaskFailed, got {:?}", other),
        }
        assert!(!cache.is_in_flight(&"a".to_string()));
        assert_eq!(cache.stats().load_failures, 1);
    }

    #[cfg(debug_assertions)]
    #[tokio::test]
    #[should_panic(expected = "加载器内不能访问同一个缓存")]
    async fn test_reentrant_loader_panics_in_debug() {
        let cache = cache();
        let same = cache.clone();
        let _ = cache
            .fetch("a".to_string(), move || {
                let _ = same.get(&"a".to_string());
                async { Ok::<_, BoxError>(1) }
            })
            .await;
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let cache = cache();
        let other = cache.clone();
        other.insert("a".to_string(), 9);
        assert_eq!(cache.get(&"a".to_string()), Some(9));
        cache.clear();
        assert!(other.is_empty());
    }
}
