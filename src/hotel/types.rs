//! 酒店和房间数据
//!
//! 只对需要翻译的字段建模，其它字段原样保存在 `extra` 中，序列化时写回。

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// 酒店详情
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HotelDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotel_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotel_name: Option<String>,
    /// 可能包含HTML标签
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amenities: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hotel_facilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub rooms: Vec<RoomOption>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 可预订的房间
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoomOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_code: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 房间详情接口的响应体
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HotelRoomResponse {
    #[serde(rename = "HotelResult", default, deserialize_with = "one_or_many")]
    pub hotel_result: Vec<HotelDetails>,
}

impl HotelRoomResponse {
    pub fn into_first(self) -> Option<HotelDetails> {
        self.hotel_result.into_iter().next()
    }
}

/// 缓存中保存的房间详情
///
/// `original` 始终是接口返回的原始数据，`display` 是当前语言下展示的数据。
/// 切换语言时总是从 `original` 重新翻译。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomDetails {
    pub original: HotelDetails,
    pub display: HotelDetails,
    pub language: String,
}

impl RoomDetails {
    /// `language` 是接口返回数据的语言
    pub fn new(original: HotelDetails, language: &str) -> Self {
        Self {
            display: original.clone(),
            original,
            language: language.to_string(),
        }
    }

    pub fn localized(&self, display: HotelDetails, language: &str) -> Self {
        Self {
            original: self.original.clone(),
            display,
            language: language.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

/// 同时接受单个对象和数组
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(item)) => vec![item],
    })
}
