//! 管理会话：登录签发、提取器校验与过期清扫
//!
//! 管理端不走 JWT，而是服务端持有的不透明会话：登录时写一行
//! `admin_sessions`（UUID 令牌 + 24 小时过期），每个请求按令牌回查。
//! 会话对两个后端一视同仁，远程不可用时会话行落在内存数据集里。

use super::models::{Admin, AdminLog, AdminSession};
use crate::hub::error::{AppError, AppResult};
use crate::hub::state::AppState;
use crate::hub::store::{FallbackStore, Query};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// 管理会话有效期：24 小时
const SESSION_TTL_HOURS: i64 = 24;
/// 过期会话清扫间隔
const SWEEP_INTERVAL_SECS: u64 = 600;

/// 凭证校验通过后签发会话，并落一条登录日志
pub async fn issue_session(
    store: &FallbackStore,
    admin: &Admin,
    ip_address: Option<String>,
    user_agent: Option<String>,
) -> AppResult<AdminSession> {
    let now = Utc::now();
    let session = store
        .create(AdminSession {
            id: 0,
            admin_id: admin.id,
            session_token: Uuid::new_v4().to_string(),
            expires_at: now + Duration::hours(SESSION_TTL_HOURS),
            ip_address: ip_address.clone(),
            user_agent: user_agent.clone(),
            created_at: Some(now),
        })
        .await?;

    record_log(
        store,
        admin.id,
        "login",
        format!("管理员 {} 登录", admin.username),
        ip_address,
        user_agent,
    )
    .await;
    Ok(session)
}

/// 写一条操作日志；日志失败不影响主操作
pub async fn record_log(
    store: &FallbackStore,
    admin_id: i64,
    action_type: &str,
    action_detail: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
) {
    let result = store
        .create(AdminLog {
            id: 0,
            admin_id,
            action_type: action_type.to_string(),
            action_detail,
            target_id: None,
            target_type: None,
            ip_address,
            user_agent,
            created_at: Some(Utc::now()),
        })
        .await;
    if let Err(e) = result {
        warn!("[Admin] 写操作日志失败: {:#}", e);
    }
}

/// 已认证的管理员请求，从 `Authorization: Bearer <session-token>` 提取
#[derive(Debug, Clone)]
pub struct AdminAuth {
    pub admin: Admin,
    pub session: AdminSession,
}

impl AdminAuth {
    /// 角色闸门：superadmin 通过一切检查
    pub fn require_role(&self, role: &str) -> AppResult<()> {
        if self.admin.role == "superadmin" || self.admin.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden("权限不足".to_string()))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("缺少会话令牌".to_string()))?;

        authenticate(&state.store, token).await
    }
}

/// 按令牌回查会话；过期的当场删掉再拒绝
pub async fn authenticate(store: &FallbackStore, token: &str) -> AppResult<AdminAuth> {
    let sessions: Vec<AdminSession> = store
        .find_all(&Query::new().eq("session_token", token.to_string()).limit(1))
        .await?;
    let session = sessions
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Unauthorized("会话无效".to_string()))?;

    if session.expires_at < Utc::now() {
        store
            .destroy::<AdminSession>(&Query::new().eq("id", session.id))
            .await?;
        return Err(AppError::Unauthorized("会话已过期，请重新登录".to_string()));
    }

    let admin: Admin = store
        .find_by_pk(session.admin_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("会话无效".to_string()))?;
    if admin.status != "active" {
        return Err(AppError::Forbidden("账号已被禁用".to_string()));
    }
    Ok(AdminAuth { admin, session })
}

/// 后台任务：周期性删掉已过期的会话行
///
/// 过滤语言没有 `<` 比较，全量拉回来在应用层判过期，再逐行删。
pub fn spawn_session_sweeper(store: Arc<FallbackStore>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_expired(&store).await {
                warn!("[Admin] 清扫过期会话失败: {:#}", e);
            }
        }
    })
}

async fn sweep_expired(store: &FallbackStore) -> AppResult<()> {
    let now = Utc::now();
    let sessions: Vec<AdminSession> = store.find_all(&Query::new()).await?;
    let mut removed = 0u64;
    for session in sessions.into_iter().filter(|s| s.expires_at < now) {
        removed += store
            .destroy::<AdminSession>(&Query::new().eq("id", session.id))
            .await?;
    }
    if removed > 0 {
        info!("[Admin] 清扫过期会话 {} 条", removed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed_admin(store: &FallbackStore, status: &str) -> Admin {
        store
            .create(Admin {
                id: 0,
                username: "管理员".to_string(),
                password: "hash".to_string(),
                email: None,
                role: "admin".to_string(),
                status: status.to_string(),
                created_at: Some(Utc::now()),
            })
            .await
            .expect("插入管理员")
    }

    #[tokio::test]
    async fn issued_session_authenticates() -> anyhow::Result<()> {
        let store = FallbackStore::empty();
        let admin = seed_admin(&store, "active").await;
        let session = issue_session(&store, &admin, Some("127.0.0.1".into()), None).await?;

        let auth = authenticate(&store, &session.session_token).await?;
        assert_eq!(auth.admin.id, admin.id);
        assert_eq!(auth.session.id, session.id);
        Ok(())
    }

    #[tokio::test]
    async fn expired_session_rejected_even_for_active_admin() -> anyhow::Result<()> {
        let store = FallbackStore::empty();
        let admin = seed_admin(&store, "active").await;
        let expired = store
            .create(AdminSession {
                id: 0,
                admin_id: admin.id,
                session_token: Uuid::new_v4().to_string(),
                expires_at: Utc::now() - Duration::hours(1),
                ip_address: None,
                user_agent: None,
                created_at: Some(Utc::now() - Duration::hours(25)),
            })
            .await?;

        let result = authenticate(&store, &expired.session_token).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
        // 过期会话行应被顺手删除
        let left: Vec<AdminSession> = store
            .find_all(&Query::new().eq("id", expired.id))
            .await?;
        assert!(left.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn disabled_admin_rejected_with_forbidden() -> anyhow::Result<()> {
        let store = FallbackStore::empty();
        let admin = seed_admin(&store, "disabled").await;
        let session = store
            .create(AdminSession {
                id: 0,
                admin_id: admin.id,
                session_token: Uuid::new_v4().to_string(),
                expires_at: Utc::now() + Duration::hours(1),
                ip_address: None,
                user_agent: None,
                created_at: Some(Utc::now()),
            })
            .await?;

        let result = authenticate(&store, &session.session_token).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        Ok(())
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_sessions() -> anyhow::Result<()> {
        let store = FallbackStore::empty();
        let admin = seed_admin(&store, "active").await;
        for hours in [-2i64, 2] {
            store
                .create(AdminSession {
                    id: 0,
                    admin_id: admin.id,
                    session_token: Uuid::new_v4().to_string(),
                    expires_at: Utc::now() + Duration::hours(hours),
                    ip_address: None,
                    user_agent: None,
                    created_at: Some(Utc::now()),
                })
                .await?;
        }

        sweep_expired(&store).await?;
        let left: Vec<AdminSession> = store.find_all(&Query::new()).await?;
        assert_eq!(left.len(), 1);
        assert!(left[0].expires_at > Utc::now());
        Ok(())
    }

    #[tokio::test]
    async fn superadmin_passes_any_role_gate() {
        let auth = AdminAuth {
            admin: Admin {
                id: 1,
                username: "root".to_string(),
                password: "hash".to_string(),
                email: None,
                role: "superadmin".to_string(),
                status: "active".to_string(),
                created_at: None,
            },
            session: AdminSession {
                id: 1,
                admin_id: 1,
                session_token: "t".to_string(),
                expires_at: Utc::now() + Duration::hours(1),
                ip_address: None,
                user_agent: None,
                created_at: None,
            },
        };
        assert!(auth.require_role("admin").is_ok());
        assert!(auth.require_role("auditor").is_ok());
    }
}
