//! HTTP 服务组装与启动

use crate::hub::state::AppState;
use crate::hub::{admin, auth, community, friends, games, media, strategies, userdata};
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// 整机请求超时：上传大视频可能走满几分钟
const REQUEST_TIMEOUT_SECS: u64 = 300;
/// 请求体上限：10 个文件 × 50MB，再留一点 multipart 边界的余量
const MAX_BODY_BYTES: usize = 512 * 1024 * 1024 + 16 * 1024 * 1024;

/// 本地前端开发口的放行名单
const DEV_ORIGINS: [&str; 6] = [
    "http://localhost:5173",
    "http://localhost:5174",
    "http://localhost:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:5174",
    "http://127.0.0.1:3000",
];

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            DEV_ORIGINS
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok()),
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/", get(liveness))
        .route("/uploads/:kind/:name", get(media::serve_upload))
        .nest("/api/auth", auth::routes::router())
        .nest("/api", games::routes::router().merge(strategies::routes::router()))
        .route("/api/users/search", get(friends::routes::search_users))
        .nest("/api/friends", friends::routes::router())
        .nest("/api/community", community::routes::router())
        .nest("/api/user", userdata::routes::router())
        .nest("/api/admin", admin::routes::router())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

async fn liveness() -> (StatusCode, &'static str) {
    (StatusCode::OK, "游戏攻略分享平台服务运行中")
}

/// 绑定端口并一直跑到进程退出
pub async fn serve(state: AppState) -> Result<()> {
    let port = state.config.port;
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("监听 {addr} 失败"))?;
    info!("[Server] 🚀 服务已启动: http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("HTTP 服务异常退出")
}
