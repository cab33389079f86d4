//! 个人数据域：收藏夹与浏览历史

pub mod models;
pub mod routes;

pub use models::{UserFavorite, UserHistory};
