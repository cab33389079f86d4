//! 社区帖子与评论模型

use crate::impl_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityPost {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub user_id: i64,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl_entity!(CommunityPost, "community_posts");

/// 聊天频道行；默认三个频道随内存数据集预置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityChannel {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_by: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl_entity!(CommunityChannel, "community_channels");

/// 频道内的公开消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityMessage {
    #[serde(default)]
    pub id: i64,
    pub channel_id: i64,
    pub user_id: i64,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl_entity!(CommunityMessage, "community_messages");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityComment {
    #[serde(default)]
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl_entity!(CommunityComment, "community_comments");
