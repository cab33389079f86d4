//! 个人数据路由：收藏夹与浏览历史

use super::models::{UserFavorite, UserHistory};
use crate::hub::auth::AuthUser;
use crate::hub::error::{AppError, AppResult};
use crate::hub::state::AppState;
use crate::hub::store::Query;
use crate::hub::strategies::Strategy;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/favorites", get(list_favorites).post(add_favorite))
        .route("/favorites/:strategy_id", delete(remove_favorite))
        .route(
            "/history",
            get(list_history).post(record_history).delete(clear_history),
        )
        .route("/history/:id", delete(remove_history))
}

/// 收藏/历史列表里的一项：记录行 + 攻略摘要
#[derive(Debug, Serialize)]
pub struct StrategyRef {
    pub id: i64,
    pub strategy_id: i64,
    pub title: String,
    pub difficulty: String,
    pub view_count: i64,
    pub at: Option<chrono::DateTime<chrono::Utc>>,
}

/// `GET /api/user/favorites`
pub async fn list_favorites(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<StrategyRef>>> {
    let rows: Vec<UserFavorite> = state
        .store
        .find_all(&Query::new().eq("user_id", auth.id).order_desc("created_at"))
        .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        // 攻略被删后收藏行残留，跳过
        let Some(strategy) = state.store.find_by_pk::<Strategy>(row.strategy_id).await? else {
            continue;
        };
        entries.push(StrategyRef {
            id: row.id,
            strategy_id: strategy.id,
            title: strategy.title,
            difficulty: strategy.difficulty,
            view_count: strategy.view_count,
            at: row.created_at,
        });
    }
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct StrategyIdBody {
    pub strategy_id: i64,
}

/// `POST /api/user/favorites`：重复收藏按 409 处理
pub async fn add_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<StrategyIdBody>,
) -> AppResult<(StatusCode, Json<UserFavorite>)> {
    let strategy: Option<Strategy> = state.store.find_by_pk(body.strategy_id).await?;
    if strategy.is_none() {
        return Err(AppError::NotFound("攻略不存在".to_string()));
    }
    let existing: Vec<UserFavorite> = state
        .store
        .find_all(
            &Query::new()
                .eq("user_id", auth.id)
                .eq("strategy_id", body.strategy_id)
                .limit(1),
        )
        .await?;
    if !existing.is_empty() {
        return Err(AppError::Conflict("已收藏过该攻略".to_string()));
    }

    let favorite = state
        .store
        .create(UserFavorite {
            id: 0,
            user_id: auth.id,
            strategy_id: body.strategy_id,
            created_at: Some(chrono::Utc::now()),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(favorite)))
}

/// `DELETE /api/user/favorites/:strategy_id`
pub async fn remove_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(strategy_id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    let removed = state
        .store
        .destroy::<UserFavorite>(
            &Query::new().eq("user_id", auth.id).eq("strategy_id", strategy_id),
        )
        .await?;
    if removed == 0 {
        return Err(AppError::NotFound("收藏记录不存在".to_string()));
    }
    Ok(Json(json!({ "message": "已取消收藏" })))
}

/// `GET /api/user/history`：最近浏览在前
pub async fn list_history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<StrategyRef>>> {
    let rows: Vec<UserHistory> = state
        .store
        .find_all(&Query::new().eq("user_id", auth.id).order_desc("viewed_at").limit(50))
        .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(strategy) = state.store.find_by_pk::<Strategy>(row.strategy_id).await? else {
            continue;
        };
        entries.push(StrategyRef {
            id: row.id,
            strategy_id: strategy.id,
            title: strategy.title,
            difficulty: strategy.difficulty,
            view_count: strategy.view_count,
            at: row.viewed_at,
        });
    }
    Ok(Json(entries))
}

/// `POST /api/user/history`：同一攻略只留一行，重复浏览刷新时间戳
pub async fn record_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<StrategyIdBody>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let strategy: Option<Strategy> = state.store.find_by_pk(body.strategy_id).await?;
    if strategy.is_none() {
        return Err(AppError::NotFound("攻略不存在".to_string()));
    }

    let now = chrono::Utc::now();
    let by_pair = Query::new()
        .eq("user_id", auth.id)
        .eq("strategy_id", body.strategy_id);
    let updated: Vec<UserHistory> = state
        .store
        .update(&json!({ "viewed_at": now }), &by_pair)
        .await?;
    if updated.is_empty() {
        state
            .store
            .create(UserHistory {
                id: 0,
                user_id: auth.id,
                strategy_id: body.strategy_id,
                viewed_at: Some(now),
            })
            .await?;
    }
    Ok((StatusCode::CREATED, Json(json!({ "message": "已记录" }))))
}

/// `DELETE /api/user/history/:id`：只能删自己的记录
pub async fn remove_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    let removed = state
        .store
        .destroy::<UserHistory>(&Query::new().eq("id", id).eq("user_id", auth.id))
        .await?;
    if removed == 0 {
        return Err(AppError::NotFound("浏览记录不存在".to_string()));
    }
    Ok(Json(json!({ "message": "删除浏览记录成功" })))
}

/// `DELETE /api/user/history`：清空当前用户的全部浏览历史
pub async fn clear_history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    let removed = state
        .store
        .destroy::<UserHistory>(&Query::new().eq("user_id", auth.id))
        .await?;
    Ok(Json(json!({ "message": "浏览历史已清空", "removed": removed })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::games::Game;
    use crate::hub::strategies::service;
    use crate::hub::strategies::types::StrategyForm;

    fn test_state() -> AppState {
        AppState::for_tests(std::env::temp_dir())
    }

    fn auth(id: i64) -> AuthUser {
        AuthUser {
            id,
            username: format!("用户{id}"),
        }
    }

    async fn seed_strategy(state: &AppState) -> i64 {
        let game = state
            .store
            .create(Game {
                id: 0,
                name: "王者荣耀".to_string(),
                description: None,
                developer: "天美".to_string(),
                category: "MOBA".to_string(),
                release_date: None,
                cover_image_url: None,
                status: "active".to_string(),
                created_at: Some(chrono::Utc::now()),
                updated_at: Some(chrono::Utc::now()),
            })
            .await
            .expect("插入游戏");
        service::create(
            &state.store,
            StrategyForm {
                title: "打野节奏".to_string(),
                content: "前四分钟的野区路线安排决定整局节奏，红开蓝开的选择要看对面打野的英雄和走向，本文结合当前版本强势打野逐一讲解开局思路。".to_string(),
                difficulty: "hard".to_string(),
                kind: "guide".to_string(),
                game_id: Some(game.id),
                user_id: Some(1),
            },
            vec![],
        )
        .await
        .expect("创建攻略")
        .strategy
        .id
    }

    #[tokio::test]
    async fn duplicate_favorite_is_conflict() {
        let state = test_state();
        let sid = seed_strategy(&state).await;

        add_favorite(
            State(state.clone()),
            auth(5),
            Json(StrategyIdBody { strategy_id: sid }),
        )
        .await
        .expect("收藏");
        let dup = add_favorite(
            State(state.clone()),
            auth(5),
            Json(StrategyIdBody { strategy_id: sid }),
        )
        .await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));

        let list = list_favorites(State(state), auth(5)).await.expect("列表");
        assert_eq!(list.0.len(), 1);
        assert_eq!(list.0[0].title, "打野节奏");
    }

    #[tokio::test]
    async fn remove_missing_favorite_is_404() {
        let state = test_state();
        let result = remove_favorite(State(state), auth(5), Path(99)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn history_upserts_single_row() {
        let state = test_state();
        let sid = seed_strategy(&state).await;

        for _ in 0..3 {
            record_history(
                State(state.clone()),
                auth(5),
                Json(StrategyIdBody { strategy_id: sid }),
            )
            .await
            .expect("记录历史");
        }

        let list = list_history(State(state), auth(5)).await.expect("历史");
        assert_eq!(list.0.len(), 1);
    }

    #[tokio::test]
    async fn history_delete_respects_ownership_and_clear_empties() {
        let state = test_state();
        let sid = seed_strategy(&state).await;
        record_history(
            State(state.clone()),
            auth(5),
            Json(StrategyIdBody { strategy_id: sid }),
        )
        .await
        .expect("记录历史");
        let rows = list_history(State(state.clone()), auth(5)).await.expect("历史");
        let history_id = rows.0[0].id;

        // 别人删不掉我的记录
        let stranger = remove_history(State(state.clone()), auth(6), Path(history_id)).await;
        assert!(matches!(stranger, Err(AppError::NotFound(_))));

        remove_history(State(state.clone()), auth(5), Path(history_id))
            .await
            .expect("本人删除");
        assert!(list_history(State(state.clone()), auth(5)).await.expect("历史").0.is_empty());

        // 再看一次同一攻略（去重后仍是一行），然后一键清空
        record_history(
            State(state.clone()),
            auth(5),
            Json(StrategyIdBody { strategy_id: sid }),
        )
        .await
        .expect("记录历史");
        let body = clear_history(State(state.clone()), auth(5)).await.expect("清空");
        assert_eq!(body.0["removed"], 1);
        assert!(list_history(State(state), auth(5)).await.expect("历史").0.is_empty());
    }

    #[tokio::test]
    async fn favorite_of_missing_strategy_is_404() {
        let state = test_state();
        let result = add_favorite(
            State(state),
            auth(5),
            Json(StrategyIdBody { strategy_id: 404 }),
        )
        .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
