//! 游戏模型

use crate::impl_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub developer: String,
    pub category: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default = "active")]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl_entity!(Game, "games");

fn active() -> String {
    "active".to_string()
}
