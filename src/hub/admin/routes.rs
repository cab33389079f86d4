//! 管理端路由：登录、登出、档案、会话校验与操作日志

use super::models::{Admin, AdminLog, AdminSession, PublicAdmin};
use super::service::{self, AdminAuth};
use crate::hub::error::{AppError, AppResult};
use crate::hub::state::AppState;
use crate::hub::store::Query;
use anyhow::Context;
use axum::extract::{ConnectInfo, Query as UrlQuery, State};
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(profile))
        .route("/verify-session", get(verify_session))
        .route("/logs", get(list_logs))
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// `POST /api/admin/login`
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<AdminLoginRequest>,
) -> AppResult<Json<Value>> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("用户名和密码不能为空".to_string()));
    }

    let admins: Vec<Admin> = state
        .store
        .find_all(&Query::new().eq("username", req.username.trim()).limit(1))
        .await?;
    let admin = admins
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Unauthorized("用户名或密码错误".to_string()))?;

    let hash = admin.password.clone();
    let password = req.password;
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(&password, &hash))
        .await
        .context("口令校验任务失败")?
        .context("口令校验失败")?;
    if !verified {
        return Err(AppError::Unauthorized("用户名或密码错误".to_string()));
    }
    if admin.status != "active" {
        return Err(AppError::Forbidden("账号已被禁用".to_string()));
    }

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let session =
        service::issue_session(&state.store, &admin, Some(addr.ip().to_string()), user_agent)
            .await?;

    info!("[Admin] {} 登录成功 (会话至 {})", admin.username, session.expires_at);
    Ok(Json(json!({
        "message": "登录成功",
        "admin": PublicAdmin::from(admin),
        "sessionToken": session.session_token,
        "expiresAt": session.expires_at,
    })))
}

/// `POST /api/admin/logout`：销毁当前会话行
pub async fn logout(State(state): State<AppState>, auth: AdminAuth) -> AppResult<Json<Value>> {
    state
        .store
        .destroy::<AdminSession>(&Query::new().eq("id", auth.session.id))
        .await?;
    service::record_log(
        &state.store,
        auth.admin.id,
        "logout",
        format!("管理员 {} 登出", auth.admin.username),
        auth.session.ip_address.clone(),
        auth.session.user_agent.clone(),
    )
    .await;
    Ok(Json(json!({ "message": "已登出" })))
}

/// `GET /api/admin/profile`
pub async fn profile(auth: AdminAuth) -> Json<PublicAdmin> {
    Json(auth.admin.into())
}

/// `GET /api/admin/verify-session`
pub async fn verify_session(auth: AdminAuth) -> Json<Value> {
    Json(json!({
        "isValid": true,
        "admin": PublicAdmin::from(auth.admin),
    }))
}

#[derive(Debug, Deserialize, Default)]
pub struct ListLogsQuery {
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(rename = "pageSize", default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub action_type: Option<String>,
}

/// `GET /api/admin/logs?page=&pageSize=&action_type=`（需要 admin 角色）
pub async fn list_logs(
    State(state): State<AppState>,
    auth: AdminAuth,
    UrlQuery(params): UrlQuery<ListLogsQuery>,
) -> AppResult<Json<Value>> {
    auth.require_role("admin")?;

    let page_size = params.page_size.unwrap_or(20).clamp(1, 100);
    let page = params.page.unwrap_or(1).max(1);
    let mut query = Query::new()
        .order_desc("created_at")
        .limit(page_size)
        .offset(page.saturating_sub(1).saturating_mul(page_size));
    let mut count_query = Query::new();
    if let Some(action_type) = params.action_type.filter(|t| !t.is_empty()) {
        query = query.eq("action_type", action_type.clone());
        count_query = count_query.eq("action_type", action_type);
    }

    let total = state.store.count::<AdminLog>(&count_query).await?;
    let logs: Vec<AdminLog> = state.store.find_all(&query).await?;
    Ok(Json(json!({
        "logs": logs,
        "total": total,
        "page": page,
        "pageSize": page_size,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_state() -> AppState {
        AppState::for_tests(std::env::temp_dir())
    }

    fn local_addr() -> ConnectInfo<SocketAddr> {
        ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 9000)))
    }

    async fn seed_admin(state: &AppState, role: &str, status: &str) -> Admin {
        let hash = bcrypt::hash("admin123", 4).expect("散列口令");
        state
            .store
            .create(Admin {
                id: 0,
                username: "管理员".to_string(),
                password: hash,
                email: None,
                role: role.to_string(),
                status: status.to_string(),
                created_at: Some(Utc::now()),
            })
            .await
            .expect("插入管理员")
    }

    #[tokio::test]
    async fn login_issues_session_token() {
        let state = test_state();
        seed_admin(&state, "admin", "active").await;

        let body = login(
            State(state.clone()),
            local_addr(),
            HeaderMap::new(),
            Json(AdminLoginRequest {
                username: "管理员".to_string(),
                password: "admin123".to_string(),
            }),
        )
        .await
        .expect("登录");
        let token = body.0["sessionToken"].as_str().expect("令牌").to_string();

        let auth = service::authenticate(&state.store, &token).await.expect("会话有效");
        assert_eq!(auth.admin.username, "管理员");
        // 登录动作应留下日志
        let logs: Vec<AdminLog> = state
            .store
            .find_all(&Query::new().eq("action_type", "login"))
            .await
            .expect("查日志");
        assert_eq!(logs.len(), 1);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let state = test_state();
        seed_admin(&state, "admin", "active").await;

        let result = login(
            State(state),
            local_addr(),
            HeaderMap::new(),
            Json(AdminLoginRequest {
                username: "管理员".to_string(),
                password: "错误口令".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn disabled_account_is_forbidden() {
        let state = test_state();
        seed_admin(&state, "admin", "disabled").await;

        let result = login(
            State(state),
            local_addr(),
            HeaderMap::new(),
            Json(AdminLoginRequest {
                username: "管理员".to_string(),
                password: "admin123".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn logout_destroys_session() {
        let state = test_state();
        let admin = seed_admin(&state, "admin", "active").await;
        let session = service::issue_session(&state.store, &admin, None, None)
            .await
            .expect("签发会话");
        let token = session.session_token.clone();
        let auth = service::authenticate(&state.store, &token).await.expect("会话有效");

        logout(State(state.clone()), auth).await.expect("登出");
        let result = service::authenticate(&state.store, &token).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}
