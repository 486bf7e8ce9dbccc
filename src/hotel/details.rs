//! 房间详情服务
//!
//! 按预订码缓存房间详情。英文数据一到就返回给调用方，
//! 其它语言的翻译在后台完成后覆盖缓存，并通过事件通知订阅者。

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::api::HotelApi;
use super::translate::HotelTranslator;
use super::types::RoomDetails;
use crate::cache::{CacheEvent, CacheResult, StaleWhileRevalidateCache};
use crate::translation::api_language_code;

/// 房间详情服务
pub struct RoomDetailsService {
    cache: StaleWhileRevalidateCache<String, RoomDetails>,
    api: Arc<dyn HotelApi>,
    translator: Arc<HotelTranslator>,
    translation_enabled: bool,
    /// 正在后台翻译的 (预订码, 语言)
    translating: Arc<DashSet<(String, String)>>,
}

impl RoomDetailsService {
    pub fn new(api: Arc<dyn HotelApi>, translator: Arc<HotelTranslator>, ttl: Duration) -> Self {
        Self::with_cache(StaleWhileRevalidateCache::new(ttl), api, translator)
    }

    pub fn with_cache(
        cache: StaleWhileRevalidateCache<String, RoomDetails>,
        api: Arc<dyn HotelApi>,
        translator: Arc<HotelTranslator>,
    ) -> Self {
        Self {
            cache,
            api,
            translator,
            translation_enabled: true,
            translating: Arc::new(DashSet::new()),
        }
    }

    /// 关闭后台翻译，始终返回接口原始数据
    pub fn with_translation_enabled(mut self, enabled: bool) -> Self {
        self.translation_enabled = enabled;
        self
    }

    /// 根据配置创建，使用 HTTP 酒店接口和翻译后端
    #[cfg(feature = "http")]
    pub fn from_config(config: &crate::config::StayfreshConfig) -> crate::error::StayfreshResult<Self> {
        use crate::error::StayfreshError;
        use crate::translation::TranslationService;

        let api = super::api::HttpHotelApi::from_settings(&config.hotel_api)?
            .ok_or_else(|| StayfreshError::Config("未配置酒店接口地址 hotel_api.base_url".to_string()))?;
        let translations = TranslationService::from_settings(&config.translation)?;
        let cache = StaleWhileRevalidateCache::with_config(&config.cache)?;

        let translator =
            HotelTranslator::with_source_lang(Arc::new(translations), &config.translation.source_lang);

        Ok(Self::with_cache(cache, Arc::new(api), Arc::new(translator))
            .with_translation_enabled(config.translation.enabled))
    }

    /// 获取房间详情
    ///
    /// 缓存未命中时请求酒店接口，同一预订码的并发请求只会发出一次。
    /// 返回的是当前可用的数据，`language` 字段标明其语言；
    /// 与请求的语言不同时会在后台翻译，完成后发出 `CacheEvent::Refined`。
    /// 不支持的语言按英文处理。
    pub async fn room_details(&self, booking_code: &str, language: &str) -> CacheResult<RoomDetails> {
        let language = api_language_code(language);
        let api = Arc::clone(&self.api);
        let code = booking_code.to_string();
        let source_lang = self.translator.source_lang().to_string();
        let details = self
            .cache
            .fetch(booking_code.to_string(), move || async move {
                api.room_details(&code)
                    .await
                    .map(|hotel| RoomDetails::new(hotel, &source_lang))
            })
            .await?;

        if self.translation_enabled && details.language != language {
            self.translate_in_background(booking_code, language);
        }

        Ok(details)
    }

    /// 在后台把缓存中的房间详情翻译为 `language`
    ///
    /// 翻译已关闭、没有缓存值、缓存已是该语言或同一翻译已在进行时返回 `None`。
    /// 翻译失败时缓存保持原样。
    ///
    /// # Panics
    ///
    /// 需要在 tokio 运行时内调用。
    pub fn translate_in_background(&self, booking_code: &str, language: &str) -> Option<JoinHandle<()>> {
        if !self.translation_enabled {
            return None;
        }

        let language = api_language_code(language);
        let current = self.cache.lookup(&booking_code.to_string())?;
        if current.value.language == language {
            return None;
        }

        let job = (booking_code.to_string(), language.to_string());
        if !self.translating.insert(job.clone()) {
            tracing::trace!("翻译已在进行: {} -> {}", booking_code, language);
            return None;
        }

        let translator = Arc::clone(&self.translator);
        let translating = Arc::clone(&self.translating);
        let target = language.to_string();
        let handle = self.cache.refine(booking_code.to_string(), move |current| async move {
            let result = translator
                .translate_hotel(current.original.clone(), &target)
                .await
                .map(|display| current.localized(display, &target));
            translating.remove(&job);
            result
        });

        if handle.is_none() {
            self.translating
                .remove(&(booking_code.to_string(), language.to_string()));
        }
        handle
    }

    /// 新鲜的缓存值，不发起请求
    pub fn cached(&self, booking_code: &str) -> Option<RoomDetails> {
        self.cache.get(&booking_code.to_string())
    }

    pub fn invalidate(&self, booking_code: &str) -> bool {
        self.cache.invalidate(&booking_code.to_string())
    }

    /// 订阅房间详情的缓存事件
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent<String, RoomDetails>> {
        self.cache.subscribe()
    }

    pub fn cache(&self) -> &StaleWhileRevalidateCache<String, RoomDetails> {
        &self.cache
    }
}
