//! 翻译后端
//!
//! `Translator` 是翻译服务依赖的唯一接口；HTTP 实现在 `http` 特性下提供。

use futures::future::BoxFuture;

use crate::error::TranslationResult;

/// 单条文本翻译接口
pub trait Translator: Send + Sync {
    /// 后端名称，参与缓存键的生成
    fn name(&self) -> &'static str;

    /// 把 `text` 从 `source_lang` 翻译为 `target_lang`
    fn translate<'a>(
        &'a self,
        text: &'a str,
        target_lang: &'a str,
        source_lang: &'a str,
    ) -> BoxFuture<'a, TranslationResult<String>>;
}

#[cfg(feature = "http")]
pub use http::{from_settings, LibreTranslateClient, MyMemoryClient};

#[cfg(feature = "http")]
mod http {
    use std::sync::Arc;

    use futures::future::{BoxFuture, FutureExt};
    use serde::{Deserialize, Serialize};

    use super::Translator;
    use crate::config::{TranslationProvider, TranslationSettings};
    use crate::error::{TranslationError, TranslationResult};

    fn build_client(settings: &TranslationSettings) -> TranslationResult<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(settings.timeout())
            .gzip(true)
            .build()?)
    }

    fn api_error(response: &reqwest::Response) -> TranslationError {
        let status = response.status();
        TranslationError::Api {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or("unknown").to_string(),
        }
    }

    /// 根据配置创建翻译后端
    pub fn from_settings(settings: &TranslationSettings) -> TranslationResult<Arc<dyn Translator>> {
        let client = build_client(settings)?;
        let api_url = settings.api_url().to_string();
        Ok(match settings.provider {
            TranslationProvider::LibreTranslate => {
                Arc::new(LibreTranslateClient::with_client(client, api_url))
            }
            TranslationProvider::MyMemory => Arc::new(MyMemoryClient::with_client(client, api_url)),
        })
    }

    #[derive(Serialize)]
    struct LibreRequest<'a> {
        q: &'a str,
        source: &'a str,
        target: &'a str,
        format: &'a str,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct LibreResponse {
        #[serde(rename = "translatedText")]
        pub translated_text: Option<String>,
    }

    /// LibreTranslate 客户端（免费，无需密钥）
    pub struct LibreTranslateClient {
        client: reqwest::Client,
        api_url: String,
    }

    impl LibreTranslateClient {
        pub fn new(api_url: impl Into<String>) -> Self {
            Self::with_client(reqwest::Client::new(), api_url)
        }

        pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
            Self {
                client,
                api_url: api_url.into(),
            }
        }
    }

    impl Translator for LibreTranslateClient {
        fn name(&self) -> &'static str {
            "libretranslate"
        }

        fn translate<'a>(
            &'a self,
            text: &'a str,
            target_lang: &'a str,
            source_lang: &'a str,
        ) -> BoxFuture<'a, TranslationResult<String>> {
            async move {
                let response = self
                    .client
                    .post(&self.api_url)
                    .json(&LibreRequest {
                        q: text,
                        source: source_lang,
                        target: target_lang,
                        format: "text",
                    })
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(api_error(&response));
                }

                let body: LibreResponse = response.json().await?;
                Ok(body.translated_text.unwrap_or_else(|| text.to_string()))
            }
            .boxed()
        }
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct MyMemoryResponse {
        #[serde(rename = "responseData")]
        pub response_data: Option<MyMemoryData>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct MyMemoryData {
        #[serde(rename = "translatedText")]
        pub translated_text: Option<String>,
    }

    /// MyMemory 客户端（免费额度：每天10000词）
    pub struct MyMemoryClient {
        client: reqwest::Client,
        api_url: String,
    }

    impl MyMemoryClient {
        pub fn new(api_url: impl Into<String>) -> Self {
            Self::with_client(reqwest::Client::new(), api_url)
        }

        pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
            Self {
                client,
                api_url: api_url.into(),
            }
        }
    }

    impl Translator for MyMemoryClient {
        fn name(&self) -> &'static str {
            "mymemory"
        }

        fn translate<'a>(
            &'a self,
            text: &'a str,
            target_lang: &'a str,
            source_lang: &'a str,
        ) -> BoxFuture<'a, TranslationResult<String>> {
            async move {
                let langpair = format!("{}|{}", source_lang, target_lang);
                let response = self
                    .client
                    .get(&self.api_url)
                    .query(&[("q", text), ("langpair", langpair.as_str())])
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(api_error(&response));
                }

                let body: MyMemoryResponse = response.json().await?;
                Ok(body
                    .response_data
                    .and_then(|data| data.translated_text)
                    .unwrap_or_else(|| text.to_string()))
            }
            .boxed()
        }
    }
}

#[cfg(all(test, feature = "http"))]
mod tests {
    use super::http::{LibreResponse, MyMemoryResponse};
    use super::*;
    use crate::config::{TranslationProvider, TranslationSettings};

    #[test]
    fn test_libre_response_shape() {
        let body: LibreResponse = serde_json::from_str(r#"{"translatedText":"مرحبا"}"#).unwrap();
        assert_eq!(body.translated_text.as_deref(), Some("مرحبا"));

        let empty: LibreResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.translated_text.is_none());
    }

    #[test]
    fn test_mymemory_response_shape() {
        let body: MyMemoryResponse = serde_json::from_str(
            r#"{"responseData":{"translatedText":"Bonjour","match":1},"responseStatus":200}"#,
        )
        .unwrap();
        assert_eq!(
            body.response_data.and_then(|d| d.translated_text).as_deref(),
            Some("Bonjour")
        );
    }

    #[test]
    fn test_from_settings_picks_provider() {
        let mut settings = TranslationSettings::default();
        assert_eq!(from_settings(&settings).unwrap().name(), "libretranslate");

        settings.provider = TranslationProvider::MyMemory;
        assert_eq!(from_settings(&settings).unwrap().name(), "mymemory");
    }
}
