//! 游戏浏览与创建路由

use super::models::Game;
use crate::hub::auth::AuthUser;
use crate::hub::error::{AppError, AppResult};
use crate::hub::state::AppState;
use crate::hub::store::{Cond, Query};
use axum::extract::{Path, Query as UrlQuery, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/games", get(list_games).post(create_game))
        .route("/games/:id", get(get_game))
}

#[derive(Debug, Deserialize, Default)]
pub struct ListGamesQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub developer: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
}

/// `GET /api/games?search=&status=`
///
/// 不传 status 时只看上架（active）游戏；search 同时命中名称与简介。
pub async fn list_games(
    State(state): State<AppState>,
    UrlQuery(params): UrlQuery<ListGamesQuery>,
) -> AppResult<Json<Vec<Game>>> {
    let status = params.status.unwrap_or_else(|| "active".to_string());
    let mut query = Query::new().eq("status", status.as_str()).order_desc("created_at");
    if let Some(search) = params.search.filter(|s| !s.is_empty()) {
        query = query.or(vec![
            Cond::Contains("name", search.clone()),
            Cond::Contains("description", search),
        ]);
    }
    let games: Vec<Game> = state.store.find_all(&query).await?;
    Ok(Json(games))
}

/// `GET /api/games/:id`
pub async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Game>> {
    let game: Game = state
        .store
        .find_by_pk(id)
        .await?
        .ok_or_else(|| AppError::NotFound("游戏不存在".to_string()))?;
    Ok(Json(game))
}

/// `POST /api/games`
pub async fn create_game(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateGameRequest>,
) -> AppResult<(StatusCode, Json<Game>)> {
    if req.name.trim().is_empty() || req.developer.trim().is_empty() || req.category.trim().is_empty()
    {
        return Err(AppError::Validation(
            "游戏名称、开发商和分类为必填字段".to_string(),
        ));
    }

    let now = chrono::Utc::now();
    let game = state
        .store
        .create(Game {
            id: 0,
            name: req.name.trim().to_string(),
            description: req.description,
            developer: req.developer.trim().to_string(),
            category: req.category.trim().to_string(),
            release_date: req.release_date,
            cover_image_url: req.cover_image_url,
            status: "active".to_string(),
            created_at: Some(now),
            updated_at: Some(now),
        })
        .await?;
    info!("[Games] {} 创建游戏: {} (id={})", auth.username, game.name, game.id);
    Ok((StatusCode::CREATED, Json(game)))
}
