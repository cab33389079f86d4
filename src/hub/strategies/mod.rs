//! 攻略域：发布、检索、媒体附件与标签

pub mod models;
pub mod routes;
pub mod service;
pub mod types;

pub use models::{MediaImage, MediaVideo, Strategy, StrategyTag, Tag};
pub use types::StrategyWithMedia;
