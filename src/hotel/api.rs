//! 酒店房间详情接口

use futures::future::BoxFuture;

use super::types::{HotelDetails, HotelRoomResponse};
use crate::error::{HotelApiError, HotelApiResult};

/// 按预订码查询房间详情
pub trait HotelApi: Send + Sync {
    fn room_details<'a>(&'a self, booking_code: &'a str) -> BoxFuture<'a, HotelApiResult<HotelDetails>>;
}

/// 解析接口响应，取第一条酒店数据
pub fn parse_room_response(body: &str, booking_code: &str) -> HotelApiResult<HotelDetails> {
    let response: HotelRoomResponse = serde_json::from_str(body)?;
    response
        .into_first()
        .ok_or_else(|| HotelApiError::NotFound(booking_code.to_string()))
}

#[cfg(feature = "http")]
pub use http::HttpHotelApi;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use futures::future::{BoxFuture, FutureExt};
    use serde::Serialize;

    use super::{parse_room_response, HotelApi};
    use crate::config::HotelApiSettings;
    use crate::error::{HotelApiError, HotelApiResult};
    use crate::hotel::types::HotelDetails;

    #[derive(Serialize)]
    struct RoomDetailsRequest<'a> {
        #[serde(rename = "BookingCode")]
        booking_code: &'a str,
    }

    /// 基于 HTTP 的房间详情接口
    pub struct HttpHotelApi {
        client: reqwest::Client,
        base_url: String,
    }

    impl HttpHotelApi {
        pub fn new(base_url: impl Into<String>, timeout: Duration) -> HotelApiResult<Self> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .gzip(true)
                .build()?;
            Ok(Self {
                client,
                base_url: base_url.into(),
            })
        }

        /// 根据配置创建，未配置地址时返回 `None`
        pub fn from_settings(settings: &HotelApiSettings) -> HotelApiResult<Option<Self>> {
            match &settings.base_url {
                Some(base_url) => Ok(Some(Self::new(base_url.clone(), settings.timeout())?)),
                None => Ok(None),
            }
        }
    }

    impl HotelApi for HttpHotelApi {
        fn room_details<'a>(&'a self, booking_code: &'a str) -> BoxFuture<'a, HotelApiResult<HotelDetails>> {
            async move {
                tracing::debug!("请求房间详情: {}", booking_code);
                let response = self
                    .client
                    .post(&self.base_url)
                    .json(&RoomDetailsRequest { booking_code })
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    return Err(HotelApiError::Api {
                        status: status.as_u16(),
                        message: status.canonical_reason().unwrap_or("unknown").to_string(),
                    });
                }

                let body = response.text().await?;
                parse_room_response(&body, booking_code)
            }
            .boxed()
        }
    }
}
