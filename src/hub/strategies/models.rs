//! 攻略与媒体行模型
//!
//! 媒体 URL 只存在于卫星表（media_images / media_videos）里，
//! 攻略行上不再有内联的 image_urls/video_urls 列。

use crate::impl_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    pub content: String,
    pub game_id: i64,
    pub user_id: i64,
    pub difficulty: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "published")]
    pub status: String,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl_entity!(Strategy, "strategies");

fn published() -> String {
    "published".to_string()
}

/// 图片附件行，一行对应一个落盘文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaImage {
    #[serde(default)]
    pub id: i64,
    pub strategy_id: i64,
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl_entity!(MediaImage, "media_images");

/// 视频附件行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaVideo {
    #[serde(default)]
    pub id: i64,
    pub strategy_id: i64,
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl_entity!(MediaVideo, "media_videos");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl_entity!(Tag, "tags");

/// 攻略-标签多对多关联行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyTag {
    #[serde(default)]
    pub id: i64,
    pub strategy_id: i64,
    pub tag_id: i64,
}

impl_entity!(StrategyTag, "strategy_tags");
