//! 酒店数据翻译
//!
//! 收集酒店和房间中所有需要翻译的文本，去重后一次批量翻译，再写回原字段。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use futures::future::join_all;
use regex::Regex;

use super::types::HotelDetails;
use crate::config::constants;
use crate::error::TranslationResult;
use crate::translation::TranslationService;

fn html_tag_regex() -> &'static Regex {
    static HTML_TAG: OnceLock<Regex> = OnceLock::new();
    HTML_TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("HTML标签正则表达式有效"))
}

/// 去掉HTML标签，返回纯文本
pub fn strip_html(html: &str) -> String {
    html_tag_regex().replace_all(html, " ").trim().to_string()
}

/// 按首次出现顺序收集的去重文本
#[derive(Default)]
struct TextBatch {
    texts: Vec<String>,
    seen: HashSet<String>,
}

impl TextBatch {
    fn push(&mut self, text: &str) {
        if text.is_empty() || self.seen.contains(text) {
            return;
        }
        self.seen.insert(text.to_string());
        self.texts.push(text.to_string());
    }

    fn push_opt(&mut self, text: Option<&str>) {
        if let Some(text) = text {
            self.push(text);
        }
    }

    fn collect(hotel: &HotelDetails) -> Self {
        let mut batch = Self::default();
        batch.push_opt(hotel.hotel_name.as_deref());
        if let Some(description) = &hotel.description {
            batch.push(&strip_html(description));
        }
        batch.push_opt(hotel.address.as_deref());
        batch.push_opt(hotel.city_name.as_deref());
        batch.push_opt(hotel.country_name.as_deref());
        for amenity in &hotel.amenities {
            batch.push(amenity);
        }
        for facility in &hotel.hotel_facilities {
            batch.push(facility);
        }
        batch.push_opt(hotel.cancellation_policy.as_deref());
        for room in &hotel.rooms {
            batch.push_opt(room.room_type.as_deref());
            batch.push_opt(room.name.as_deref());
            batch.push_opt(room.meal_type.as_deref());
        }
        batch
    }
}

fn apply(field: &mut Option<String>, translations: &HashMap<String, String>) {
    if let Some(text) = field.as_mut() {
        if let Some(translated) = translations.get(text.as_str()) {
            *text = translated.clone();
        }
    }
}

fn apply_all(items: &mut [String], translations: &HashMap<String, String>) {
    for item in items.iter_mut() {
        if let Some(translated) = translations.get(item.as_str()) {
            *item = translated.clone();
        }
    }
}

/// 酒店数据翻译器
pub struct HotelTranslator {
    translations: Arc<TranslationService>,
    source_lang: String,
}

impl HotelTranslator {
    /// 创建翻译器，酒店数据按英文处理
    pub fn new(translations: Arc<TranslationService>) -> Self {
        Self::with_source_lang(translations, constants::DEFAULT_SOURCE_LANG)
    }

    pub fn with_source_lang(translations: Arc<TranslationService>, source_lang: &str) -> Self {
        Self {
            translations,
            source_lang: source_lang.to_string(),
        }
    }

    pub fn translations(&self) -> &TranslationService {
        &self.translations
    }

    /// 接口返回数据的语言
    pub fn source_lang(&self) -> &str {
        &self.source_lang
    }

    /// 目标语言是否需要翻译
    pub fn needs_translation(&self, language: &str) -> bool {
        language != self.source_lang
    }

    /// 翻译一家酒店，返回新的数据，输入不变
    ///
    /// 目标语言与源语言相同时直接返回。单条文本翻译失败时保留原文；
    /// 只有全部文本都失败时才返回错误。
    pub async fn translate_hotel(
        &self,
        hotel: HotelDetails,
        language: &str,
    ) -> TranslationResult<HotelDetails> {
        if !self.needs_translation(language) {
            return Ok(hotel);
        }

        let batch = TextBatch::collect(&hotel);
        if batch.texts.is_empty() {
            return Ok(hotel);
        }

        let results = self
            .translations
            .translate_each(&batch.texts, language, &self.source_lang)
            .await;

        let total = results.len();
        let mut translations = HashMap::with_capacity(total);
        let mut last_error = None;
        for (text, result) in batch.texts.into_iter().zip(results) {
            match result {
                Ok(translated) => {
                    translations.insert(text, translated);
                }
                Err(e) => {
                    tracing::debug!("文本翻译失败，保留原文: {}: {}", text, e);
                    last_error = Some(e);
                }
            }
        }

        if translations.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        } else if last_error.is_some() {
            tracing::warn!(
                "部分文本翻译失败，已翻译 {}/{} 条",
                translations.len(),
                total
            );
        }

        let mut result = hotel;
        apply(&mut result.hotel_name, &translations);
        if let Some(description) = result.description.as_mut() {
            let plain = strip_html(description);
            if let Some(translated) = translations.get(&plain) {
                *description = description.replace(&plain, translated);
            }
        }
        apply(&mut result.address, &translations);
        apply(&mut result.city_name, &translations);
        apply(&mut result.country_name, &translations);
        apply_all(&mut result.amenities, &translations);
        apply_all(&mut result.hotel_facilities, &translations);
        apply(&mut result.cancellation_policy, &translations);
        for room in result.rooms.iter_mut() {
            apply(&mut room.room_type, &translations);
            apply(&mut room.name, &translations);
            apply(&mut room.meal_type, &translations);
        }

        Ok(result)
    }

    /// 翻译一家酒店，出错时记录日志并返回原数据
    pub async fn translate_hotel_or_original(&self, hotel: HotelDetails, language: &str) -> HotelDetails {
        match self.translate_hotel(hotel.clone(), language).await {
            Ok(translated) => translated,
            Err(e) => {
                tracing::warn!("酒店数据翻译失败，使用原数据: {}", e);
                hotel
            }
        }
    }

    /// 翻译酒店列表
    ///
    /// 每组并行翻译若干家，组之间稍作停顿，避免压垮翻译接口。
    pub async fn translate_hotels(&self, hotels: Vec<HotelDetails>, language: &str) -> Vec<HotelDetails> {
        if !self.needs_translation(language) || hotels.is_empty() {
            return hotels;
        }

        let total = hotels.len();
        let mut translated = Vec::with_capacity(total);
        let mut remaining = hotels.into_iter().peekable();

        while remaining.peek().is_some() {
            let chunk: Vec<HotelDetails> = remaining
                .by_ref()
                .take(constants::HOTEL_TRANSLATION_CHUNK)
                .collect();
            let results = join_all(
                chunk
                    .into_iter()
                    .map(|hotel| self.translate_hotel_or_original(hotel, language)),
            )
            .await;
            translated.extend(results);

            if remaining.peek().is_some() {
                tokio::time::sleep(constants::HOTEL_TRANSLATION_DELAY).await;
            }
        }

        tracing::debug!("已翻译 {} 家酒店", total);
        translated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranslationError;
    use crate::hotel::types::RoomOption;
    use crate::translation::Translator;
    use futures::future::{BoxFuture, FutureExt};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 在文本前加上语言前缀的假后端
    #[derive(Default)]
    struct PrefixTranslator {
        calls: AtomicUsize,
        fail: bool,
        /// 只对这条文本报错
        fail_on: Option<&'static str>,
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
            let fail = self.fail || self.fail_on == Some(text);
            async move {
                if fail {
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

    fn translator(fail: bool) -> (Arc<PrefixTranslator>, HotelTranslator) {
        let backend = Arc::new(PrefixTranslator {
            fail,
            ..PrefixTranslator::default()
        });
        let service = TranslationService::new(backend.clone());
        (backend, HotelTranslator::new(Arc::new(service)))
    }

    fn sample_hotel() -> HotelDetails {
        HotelDetails {
            hotel_code: Some("1402689".to_string()),
            hotel_name: Some("Sea View".to_string()),
            description: Some("<p>Beach front</p>".to_string()),
            city_name: Some("Dubai".to_string()),
            amenities: vec!["Pool".to_string(), "Dubai".to_string()],
            rooms: vec![RoomOption {
                name: Some("Deluxe".to_string()),
                meal_type: Some("Breakfast".to_string()),
                booking_code: Some("HDS123".to_string()),
                ..RoomOption::default()
            }],
            ..HotelDetails::default()
        }
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Beach <b>front</b></p>"), "Beach  front");
        assert_eq!(strip_html("plain"), "plain");
        assert_eq!(strip_html("<br/>"), "");
    }

    #[test]
    fn test_collect_dedups_in_order() {
        let batch = TextBatch::collect(&sample_hotel());
        assert_eq!(
            batch.texts,
            vec!["Sea View", "Beach front", "Dubai", "Pool", "Deluxe", "Breakfast"]
        );
    }

    #[tokio::test]
    async fn test_english_is_returned_as_is() {
        let (backend, translator) = translator(false);
        let hotel = sample_hotel();
        let result = translator.translate_hotel(hotel.clone(), "en").await.unwrap();
        assert_eq!(result, hotel);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fields_are_translated() {
        let (backend, translator) = translator(false);
        let result = translator.translate_hotel(sample_hotel(), "ar").await.unwrap();

        assert_eq!(result.hotel_name.as_deref(), Some("[ar] Sea View"));
        assert_eq!(result.description.as_deref(), Some("<p>[ar] Beach front</p>"));
        assert_eq!(result.city_name.as_deref(), Some("[ar] Dubai"));
        assert_eq!(result.amenities, vec!["[ar] Pool", "[ar] Dubai"]);
        assert_eq!(result.rooms[0].name.as_deref(), Some("[ar] Deluxe"));
        assert_eq!(result.rooms[0].meal_type.as_deref(), Some("[ar] Breakfast"));
        // 预订码不参与翻译
        assert_eq!(result.rooms[0].booking_code.as_deref(), Some("HDS123"));
        assert_eq!(result.hotel_code.as_deref(), Some("1402689"));
        // "Dubai" 只请求一次
        assert_eq!(backend.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_failure_is_reported() {
        let (_, translator) = translator(true);
        assert!(translator.translate_hotel(sample_hotel(), "ar").await.is_err());

        let hotel = sample_hotel();
        assert_eq!(translator.translate_hotel_or_original(hotel.clone(), "ar").await, hotel);
    }

    #[tokio::test]
    async fn test_one_failing_text_keeps_the_rest() {
        let backend = Arc::new(PrefixTranslator {
            fail_on: Some("Pool"),
            ..PrefixTranslator::default()
        });
        let translator = HotelTranslator::new(Arc::new(TranslationService::new(backend)));

        let result = translator.translate_hotel(sample_hotel(), "ar").await.unwrap();
        assert_eq!(result.hotel_name.as_deref(), Some("[ar] Sea View"));
        assert_eq!(result.amenities, vec!["Pool", "[ar] Dubai"]);
        assert_eq!(result.rooms[0].name.as_deref(), Some("[ar] Deluxe"));
    }

    #[tokio::test]
    async fn test_configured_source_language() {
        let backend = Arc::new(PrefixTranslator::default());
        let service = Arc::new(TranslationService::new(backend.clone()));
        let translator = HotelTranslator::with_source_lang(service, "fr");

        assert!(!translator.needs_translation("fr"));
        assert!(translator.needs_translation("en"));

        let hotel = sample_hotel();
        assert_eq!(translator.translate_hotel(hotel.clone(), "fr").await.unwrap(), hotel);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);

        let result = translator.translate_hotel(hotel, "en").await.unwrap();
        assert_eq!(result.hotel_name.as_deref(), Some("[en] Sea View"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_translate_hotels_in_chunks() {
        let (_, translator) = translator(false);
        let hotels: Vec<HotelDetails> = (0..7)
            .map(|i| HotelDetails {
                hotel_name: Some(format!("Hotel {}", i)),
                ..HotelDetails::default()
            })
            .collect();

        let started = tokio::time::Instant::now();
        let translated = translator.translate_hotels(hotels, "fr").await;

        assert_eq!(translated.len(), 7);
        assert_eq!(translated[6].hotel_name.as_deref(), Some("[fr] Hotel 6"));
        // 两组之间停顿一次
        let elapsed = started.elapsed();
        assert!(elapsed >= constants::HOTEL_TRANSLATION_DELAY);
        assert!(elapsed < constants::HOTEL_TRANSLATION_DELAY * 2);
    }
}
