// 集成测试公共模块
//
// 提供假的酒店接口、假的翻译后端和等待缓存事件的辅助函数

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::{broadcast, Semaphore};

use stayfresh::cache::CacheEvent;
use stayfresh::error::{HotelApiError, HotelApiResult, TranslationError, TranslationResult};
use stayfresh::hotel::{HotelApi, HotelDetails, HotelTranslator, RoomOption};
use stayfresh::translation::{TranslationService, Translator};

/// 等待事件的最长时间
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// 构造一家测试酒店
pub fn sample_hotel(booking_code: &str) -> HotelDetails {
    HotelDetails {
        hotel_code: Some("1402689".to_string()),
        hotel_name: Some("Marina Bay Suites".to_string()),
        description: Some("<p>Steps from the beach</p>".to_string()),
        city_name: Some("Dubai".to_string()),
        amenities: vec!["Free WiFi".to_string(), "Pool".to_string()],
        rooms: vec![RoomOption {
            name: Some("Deluxe King".to_string()),
            meal_type: Some("Breakfast".to_string()),
            booking_code: Some(booking_code.to_string()),
            ..RoomOption::default()
        }],
        ..HotelDetails::default()
    }
}

/// 需要翻译的文本条数，与 `sample_hotel` 对应
pub const SAMPLE_HOTEL_TEXTS: usize = 7;

/// 假的酒店接口
///
/// 只认识登记过的预订码；可以用闸门挡住请求，直到测试放行。
pub struct MockHotelApi {
    hotels: HashMap<String, HotelDetails>,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl MockHotelApi {
    pub fn new(booking_codes: &[&str]) -> Self {
        let hotels = booking_codes
            .iter()
            .map(|code| (code.to_string(), sample_hotel(code)))
            .collect();
        Self {
            hotels,
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// 请求会一直等待，直到闸门放行
    pub fn gated(booking_codes: &[&str]) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mut api = Self::new(booking_codes);
        api.gate = Some(Arc::clone(&gate));
        (api, gate)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HotelApi for MockHotelApi {
    fn room_details<'a>(&'a self, booking_code: &'a str) -> BoxFuture<'a, HotelApiResult<HotelDetails>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        async move {
            if let Some(gate) = &self.gate {
                gate.acquire().await.expect("gate closed").forget();
            }
            self.hotels
                .get(booking_code)
                .cloned()
                .ok_or_else(|| HotelApiError::NotFound(booking_code.to_string()))
        }
        .boxed()
    }
}

/// 在文本前加上 `[语言]` 的假翻译后端
#[derive(Default)]
pub struct PrefixTranslator {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl PrefixTranslator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Translator for PrefixTranslator {
    fn name(&self) -> &'static str {
        "prefix"
    }

    fn translate<'a>(
        &'a self,
        text: &'a str,
        target_lang: &'a str,
        _source_lang: &'a str,
    ) -> BoxFuture<'a, TranslationResult<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing.load(Ordering::SeqCst);
        async move {
            // 让出一次，模拟网络请求
            tokio::task::yield_now().await;
            if failing {
                Err(TranslationError::Api {
                    status: 503,
                    message: "Service Unavailable".to_string(),
                })
            } else {
                Ok(format!("[{}] {}", target_lang, text))
            }
        }
        .boxed()
    }
}

/// 创建酒店翻译器，同时返回底层假后端以便检查调用次数
pub fn hotel_translator() -> (Arc<PrefixTranslator>, Arc<HotelTranslator>) {
    let backend = Arc::new(PrefixTranslator::default());
    let service = TranslationService::new(backend.clone());
    (backend, Arc::new(HotelTranslator::new(Arc::new(service))))
}

/// 等待第一个满足条件的事件
pub async fn wait_for_event<K, V, F>(
    events: &mut broadcast::Receiver<CacheEvent<K, V>>,
    mut matches: F,
) -> CacheEvent<K, V>
where
    K: Clone,
    V: Clone,
    F: FnMut(&CacheEvent<K, V>) -> bool,
{
    tokio::time::timeout(EVENT_TIMEOUT, async {
        loop {
            match events.recv().await {
                Ok(event) if matches(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for cache event")
}
