//! 翻译服务
//!
//! 在 `Translator` 之上提供：
//!
//! - **结果缓存**: 同一 (后端, 源语言, 目标语言, 文本) 只请求一次
//! - **批量翻译**: 保持输入顺序，同时在途的请求数受 `max_concurrent` 限制
//! - **宽松模式**: `translate_text_or_original` 出错时返回原文

use std::sync::Arc;

use blake3::Hasher;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt, TryStreamExt};

use super::client::Translator;
use crate::config::constants;
use crate::error::TranslationResult;

/// 翻译服务
pub struct TranslationService {
    translator: Arc<dyn Translator>,
    memo: DashMap<String, String>,
    max_concurrent: usize,
}

impl TranslationService {
    /// 创建新的翻译服务
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self::with_concurrency(translator, constants::DEFAULT_MAX_CONCURRENT_REQUESTS)
    }

    pub fn with_concurrency(translator: Arc<dyn Translator>, max_concurrent: usize) -> Self {
        Self {
            translator,
            memo: DashMap::new(),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// 根据配置创建翻译服务
    #[cfg(feature = "http")]
    pub fn from_settings(settings: &crate::config::TranslationSettings) -> TranslationResult<Self> {
        let translator = super::client::from_settings(settings)?;
        Ok(Self::with_concurrency(translator, settings.max_concurrent_requests))
    }

    /// 翻译单条文本
    ///
    /// 源语言和目标语言相同、或文本为空白时直接返回原文。
    pub async fn translate_text(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: &str,
    ) -> TranslationResult<String> {
        if target_lang == source_lang || text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let key = generate_cache_key(self.translator.name(), text, source_lang, target_lang);
        let cached = self.memo.get(&key).map(|hit| hit.value().clone());
        if let Some(translated) = cached {
            return Ok(translated);
        }

        let translated = self
            .translator
            .translate(text, target_lang, source_lang)
            .await?;
        self.memo.insert(key, translated.clone());
        Ok(translated)
    }

    /// 翻译单条文本，出错时记录日志并返回原文
    pub async fn translate_text_or_original(
        &self,
        text: &str,
        target_lang: &str,
        source_lang: &str,
    ) -> String {
        match self.translate_text(text, target_lang, source_lang).await {
            Ok(translated) => translated,
            Err(e) => {
                tracing::warn!("翻译失败，使用原文: {}", e);
                text.to_string()
            }
        }
    }

    /// 批量翻译，结果与输入一一对应；任意一条失败则整体失败
    pub async fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
        source_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        stream::iter(self.pending(texts, target_lang, source_lang))
            .buffered(self.max_concurrent)
            .try_collect()
            .await
    }

    /// 逐条翻译，每条文本各自返回结果，一条失败不影响其它文本
    pub async fn translate_each(
        &self,
        texts: &[String],
        target_lang: &str,
        source_lang: &str,
    ) -> Vec<TranslationResult<String>> {
        stream::iter(self.pending(texts, target_lang, source_lang))
            .buffered(self.max_concurrent)
            .collect()
            .await
    }

    // 先收集成装箱的 future，流本身才满足 `Send`
    fn pending<'a>(
        &'a self,
        texts: &'a [String],
        target_lang: &'a str,
        source_lang: &'a str,
    ) -> Vec<BoxFuture<'a, TranslationResult<String>>> {
        texts
            .iter()
            .map(|text| self.translate_text(text, target_lang, source_lang).boxed())
            .collect()
    }

    /// 清空翻译缓存
    pub fn clear_cache(&self) {
        self.memo.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.memo.len()
    }
}

/// 把界面语言代码映射为翻译接口支持的代码
///
/// 只看主标签（`fr-FR` -> `fr`），不支持的语言回退为英文。
pub fn api_language_code(language: &str) -> &'static str {
    let primary = language
        .trim()
        .split(|c: char| c == '-' || c == '_')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    constants::SUPPORTED_LANGUAGES
        .iter()
        .copied()
        .find(|code| *code == primary)
        .unwrap_or(constants::DEFAULT_SOURCE_LANG)
}

/// 生成缓存键
pub fn generate_cache_key(provider: &str, text: &str, source_lang: &str, target_lang: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(source_lang.as_bytes());
    hasher.update(&[0]);
    hasher.update(target_lang.as_bytes());
    hasher.update(&[0]);
    hasher.update(text.as_bytes());
    format!("{}:{}", provider, hasher.finalize().to_hex())
}
