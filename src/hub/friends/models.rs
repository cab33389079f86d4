//! 好友关系、好友申请与私聊消息模型

use crate::impl_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 好友关系行；接受申请时成对写入（user→friend 与 friend→user 各一行）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friendship {
    #[serde(default)]
    pub id: i64,
    pub user_id: i64,
    pub friend_id: i64,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl_entity!(Friendship, "friendships");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequest {
    #[serde(default)]
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    #[serde(default)]
    pub message: Option<String>,
    /// pending | accepted | rejected
    pub status: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl_entity!(FriendRequest, "friend_requests");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    #[serde(default = "text_type")]
    pub message_type: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl_entity!(ChatMessage, "chat_messages");

fn text_type() -> String {
    "text".to_string()
}
