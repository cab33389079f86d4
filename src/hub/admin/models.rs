//! 管理员、管理会话与操作日志模型

use crate::impl_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    #[serde(default)]
    pub id: i64,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    /// admin | superadmin
    pub role: String,
    /// active 之外的状态一律视为禁用
    #[serde(default = "active")]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl_entity!(Admin, "admins");

fn active() -> String {
    "active".to_string()
}

/// 对外暴露的管理员信息（不带密码散列）
#[derive(Debug, Clone, Serialize)]
pub struct PublicAdmin {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    pub status: String,
}

impl From<Admin> for PublicAdmin {
    fn from(admin: Admin) -> Self {
        Self {
            id: admin.id,
            username: admin.username,
            email: admin.email,
            role: admin.role,
            status: admin.status,
        }
    }
}

/// 不透明会话行：令牌是 UUID v4 字符串，过期判定只看 expires_at
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSession {
    #[serde(default)]
    pub id: i64,
    pub admin_id: i64,
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl_entity!(AdminSession, "admin_sessions");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLog {
    #[serde(default)]
    pub id: i64,
    pub admin_id: i64,
    pub action_type: String,
    pub action_detail: String,
    #[serde(default)]
    pub target_id: Option<i64>,
    #[serde(default)]
    pub target_type: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl_entity!(AdminLog, "admin_logs");
