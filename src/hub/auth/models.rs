//! 用户模型

use crate::impl_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 用户行（含密码散列，仅在存储层流转）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: i64,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "offline")]
    pub online_status: String,
    #[serde(default)]
    pub last_active: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl_entity!(User, "users");

fn offline() -> String {
    "offline".to_string()
}

/// 对外暴露的用户信息，密码散列永远不出存储层
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub online_status: String,
    pub last_active: Option<DateTime<Utc>>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            online_status: user.online_status,
            last_active: user.last_active,
        }
    }
}
