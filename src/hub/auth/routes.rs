//! 用户注册 / 登录 / 当前用户信息路由

use super::models::{PublicUser, User};
use super::token::{issue_token, AuthUser};
use crate::hub::error::{AppError, AppResult};
use crate::hub::state::AppState;
use crate::hub::store::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// `POST /api/auth/register`
///
/// 用户名唯一性在当前生效的后端上检查：远程可达时查远程，
/// 降级时查内存数据集，两种模式下重复注册都会得到 409。
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".to_string(),
        ));
    }
    let username = req.username.trim().to_string();

    let existing: Vec<User> = state
        .store
        .find_all(&Query::new().eq("username", username.as_str()).limit(1))
        .await?;
    if !existing.is_empty() {
        return Err(AppError::Conflict("Username already taken".to_string()));
    }

    // bcrypt 是 CPU 密集操作，挪出异步执行器
    let password = req.password.clone();
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(anyhow::Error::from)?
        .map_err(anyhow::Error::from)?;

    let now = chrono::Utc::now();
    let user = state
        .store
        .create(User {
            id: 0,
            username: username.clone(),
            password: hashed,
            email: req.email.filter(|e| !e.is_empty()),
            online_status: "online".to_string(),
            last_active: Some(now),
            created_at: Some(now),
            updated_at: Some(now),
        })
        .await?;

    info!("[Auth] 新用户注册: {} (id={})", user.username, user.id);
    let token = issue_token(user.id, &user.username, &state.config.secret_key)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "token": token,
            "user": PublicUser::from(user),
        })),
    ))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<Value>> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    let users: Vec<User> = state
        .store
        .find_all(&Query::new().eq("username", req.username.as_str()).limit(1))
        .await?;
    let user = users
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let password = req.password.clone();
    let hash = user.password.clone();
    let matched = tokio::task::spawn_blocking(move || bcrypt::verify(&password, &hash))
        .await
        .map_err(anyhow::Error::from)?
        .unwrap_or(false);
    if !matched {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    // 登录即在线
    let now = chrono::Utc::now();
    let _: Vec<User> = state
        .store
        .update(
            &json!({ "online_status": "online", "last_active": now }),
            &Query::new().eq("id", user.id),
        )
        .await?;

    info!("[Auth] 用户登录: {} (id={})", user.username, user.id);
    let token = issue_token(user.id, &user.username, &state.config.secret_key)?;
    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": PublicUser::from(user),
    })))
}

/// `GET /api/auth/me`
pub async fn me(auth: AuthUser, State(state): State<AppState>) -> AppResult<Json<Value>> {
    let user: User = state
        .store
        .find_by_pk(auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("用户不存在".to_string()))?;
    Ok(Json(json!({ "user": PublicUser::from(user) })))
}

/// `POST /api/auth/logout`
///
/// JWT 无状态，客户端丢弃令牌即可；这里只把在线状态落回 offline。
pub async fn logout(auth: AuthUser, State(state): State<AppState>) -> AppResult<Json<Value>> {
    let _: Vec<User> = state
        .store
        .update(
            &json!({ "online_status": "offline" }),
            &Query::new().eq("id", auth.id),
        )
        .await?;
    Ok(Json(json!({ "message": "Logged out successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::auth::token::decode_token;

    fn test_state() -> AppState {
        AppState::for_tests(std::env::temp_dir())
    }

    #[tokio::test]
    async fn register_then_duplicate_conflicts() {
        let state = test_state();
        let first = register(
            State(state.clone()),
            Json(RegisterRequest {
                username: "旅行者".into(),
                password: "hunter2".into(),
                email: None,
            }),
        )
        .await
        .expect("首次注册成功");
        assert_eq!(first.0, StatusCode::CREATED);

        let second = register(
            State(state),
            Json(RegisterRequest {
                username: "旅行者".into(),
                password: "other".into(),
                email: None,
            }),
        )
        .await;
        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn register_requires_username_and_password() {
        let state = test_state();
        let result = register(
            State(state),
            Json(RegisterRequest {
                username: "".into(),
                password: "".into(),
                email: None,
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn login_issues_decodable_token() {
        let state = test_state();
        register(
            State(state.clone()),
            Json(RegisterRequest {
                username: "枪王".into(),
                password: "secret-pw".into(),
                email: Some("gun@example.com".into()),
            }),
        )
        .await
        .expect("注册成功");

        let response = login(
            State(state.clone()),
            Json(LoginRequest {
                username: "枪王".into(),
                password: "secret-pw".into(),
            }),
        )
        .await
        .expect("登录成功");
        let token = response.0["token"].as_str().expect("返回令牌").to_string();
        let claims = decode_token(&token, "test-secret").expect("令牌可解析");
        assert_eq!(claims.username, "枪王");
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let state = test_state();
        register(
            State(state.clone()),
            Json(RegisterRequest {
                username: "野区霸主".into(),
                password: "right".into(),
                email: None,
            }),
        )
        .await
        .expect("注册成功");

        let result = login(
            State(state),
            Json(LoginRequest {
                username: "野区霸主".into(),
                password: "wrong".into(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}
