//! 统一错误类型与 HTTP 映射
//!
//! 路由处理器内的所有失败都收敛到 [`AppError`]，再统一映射成
//! `{"message": "..."}` 的 JSON 响应（老版本里 `message` 和 `error`
//! 两种键混用，这里统一为 `message`）。任何错误都不会让进程退出。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// 输入缺失或非法
    #[error("{0}")]
    Validation(String),

    /// 引用的实体不存在
    #[error("{0}")]
    NotFound(String),

    /// 凭证缺失或已过期
    #[error("{0}")]
    Unauthorized(String),

    /// 凭证有效但权限不足
    #[error("{0}")]
    Forbidden(String),

    /// 唯一性冲突
    #[error("{0}")]
    Conflict(String),

    /// 两个后端都无法给出结果，或其他内部失败
    #[error("服务器内部错误")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if let AppError::Internal(e) = &self {
            error!("[Error] 内部错误: {:#}", e);
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
