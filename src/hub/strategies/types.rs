//! 攻略域的请求 / 响应结构

use super::models::Strategy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Default)]
pub struct ListStrategiesQuery {
    #[serde(default)]
    pub game_id: Option<i64>,
    #[serde(default)]
    pub difficulty: Option<String>,
    /// `newest`（默认） | `oldest` | `popular`
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// 附件统计
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MediaStats {
    pub image_count: usize,
    pub video_count: usize,
    pub total_size: i64,
}

/// 攻略 + 由媒体行拼出的 URL 数组
#[derive(Debug, Clone, Serialize)]
pub struct StrategyWithMedia {
    #[serde(flatten)]
    pub strategy: Strategy,
    pub image_urls: Vec<String>,
    pub video_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_stats: Option<MediaStats>,
}

/// 攻略创建的文本字段（multipart 中与文件字段并列）
#[derive(Debug, Default, Clone)]
pub struct StrategyForm {
    pub title: String,
    pub content: String,
    pub difficulty: String,
    pub kind: String,
    pub game_id: Option<i64>,
    pub user_id: Option<i64>,
}

/// 删除攻略后返回的清理计数
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RemovedCounts {
    pub media_rows: u64,
    pub files: u64,
}
