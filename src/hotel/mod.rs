//! 酒店模块
//!
//! - **types**: 酒店、房间和缓存中的房间详情
//! - **api**: 房间详情接口，HTTP 实现在 `http` 特性下提供
//! - **translate**: 酒店数据的批量翻译
//! - **details**: 带缓存和后台翻译的房间详情服务

pub mod api;
pub mod details;
pub mod translate;
pub mod types;

pub use api::{parse_room_response, HotelApi};
#[cfg(feature = "http")]
pub use api::HttpHotelApi;
pub use details::RoomDetailsService;
pub use translate::{strip_html, HotelTranslator};
pub use types::{HotelDetails, HotelRoomResponse, RoomDetails, RoomOption};
