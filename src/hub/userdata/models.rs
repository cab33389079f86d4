//! 收藏与浏览历史模型

use crate::impl_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 收藏行，(user_id, strategy_id) 在应用层保证唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFavorite {
    #[serde(default)]
    pub id: i64,
    pub user_id: i64,
    pub strategy_id: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl_entity!(UserFavorite, "user_favorites");

/// 浏览历史行，重复浏览只刷新 viewed_at
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserHistory {
    #[serde(default)]
    pub id: i64,
    pub user_id: i64,
    pub strategy_id: i64,
    #[serde(default)]
    pub viewed_at: Option<DateTime<Utc>>,
}

impl_entity!(UserHistory, "user_history");
