//! 用户 JWT 签发 / 校验与提取器
//!
//! 对称密钥（`SECRET_KEY`）HS256 签名，1 小时过期，载荷只带 `{id, username}`。
//! 失败语义：缺少令牌 → 401，令牌非法或过期 → 403。

use crate::hub::error::AppError;
use crate::hub::state::AppState;
use anyhow::{Context, Result};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT 有效期（秒）
const TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    pub exp: usize,
}

/// 签发用户令牌
pub fn issue_token(id: i64, username: &str, secret: &str) -> Result<String> {
    issue_token_with_ttl(id, username, secret, TOKEN_TTL_SECS)
}

fn issue_token_with_ttl(id: i64, username: &str, secret: &str, ttl_secs: i64) -> Result<String> {
    let exp = (chrono::Utc::now().timestamp() + ttl_secs) as usize;
    let claims = Claims {
        id,
        username: username.to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("签发 JWT 失败")
}

/// 校验并解析用户令牌
pub fn decode_token(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .context("JWT 校验失败")?;
    Ok(data.claims)
}

/// 已认证用户，从 `Authorization: Bearer <jwt>` 头提取
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("缺少认证令牌".to_string()))?;

        let claims = decode_token(token, &state.config.secret_key)
            .map_err(|_| AppError::Forbidden("认证令牌无效或已过期".to_string()))?;

        Ok(AuthUser {
            id: claims.id,
            username: claims.username,
        })
    }
}
