//! 攻略路由：列表、详情、multipart 创建、删除，以及标签列表

use super::models::Tag;
use super::service;
use super::types::{ListStrategiesQuery, StrategyForm};
use crate::hub::auth::AuthUser;
use crate::hub::error::{AppError, AppResult};
use crate::hub::media::upload::{self, MediaKind, SavedFile};
use crate::hub::state::AppState;
use crate::hub::store::Query;
use axum::extract::{Multipart, Path, Query as UrlQuery, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/strategies", get(list_strategies).post(create_strategy))
        .route("/strategies/:id", get(get_strategy).delete(delete_strategy))
        .route("/tags", get(list_tags))
}

/// `GET /api/strategies?game_id=&difficulty=&sort=&page=&limit=&search=`
pub async fn list_strategies(
    State(state): State<AppState>,
    UrlQuery(params): UrlQuery<ListStrategiesQuery>,
) -> AppResult<Json<Value>> {
    let (strategies, total) = service::list(&state.store, &params).await?;
    Ok(Json(json!({
        "success": true,
        "data": { "strategies": strategies, "total": total }
    })))
}

/// `GET /api/strategies/:id`，每次命中浏览数加一
pub async fn get_strategy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let strategy = service::detail(&state.store, id).await?;
    Ok(Json(json!({ "success": true, "data": strategy })))
}

/// `POST /api/strategies`（multipart：文本字段 + `images`/`videos` 文件字段）
pub async fn create_strategy(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Value>)> {
    let mut form = StrategyForm {
        user_id: Some(auth.id),
        ..StrategyForm::default()
    };
    let mut files: Vec<SavedFile> = Vec::new();

    // 字段边读边落盘；任何一个字段出错就把已写入的文件全部回滚
    if let Err(e) = collect_parts(&state, &mut multipart, &mut form, &mut files).await {
        upload::cleanup(&files).await;
        return Err(e);
    }

    let strategy = service::create(&state.store, form, files).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": strategy })),
    ))
}

async fn collect_parts(
    state: &AppState,
    multipart: &mut Multipart,
    form: &mut StrategyForm,
    files: &mut Vec<SavedFile>,
) -> AppResult<()> {
    let mut image_count = 0usize;
    let mut video_count = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("上传内容解析失败: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if let Some(kind) = MediaKind::from_field(&name) {
            if files.len() >= upload::MAX_FILES_PER_REQUEST {
                return Err(AppError::Validation("一次最多上传10个文件".to_string()));
            }
            match kind {
                MediaKind::Image if image_count >= upload::MAX_IMAGES => {
                    return Err(AppError::Validation("图片最多上传5张".to_string()));
                }
                MediaKind::Video if video_count >= upload::MAX_VIDEOS => {
                    return Err(AppError::Validation("视频最多上传1个".to_string()));
                }
                _ => {}
            }

            let original_name = field
                .file_name()
                .map(str::to_string)
                .ok_or_else(|| AppError::Validation("文件字段缺少文件名".to_string()))?;
            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("读取上传文件失败: {e}")))?;

            let saved = upload::save(
                &state.config.upload_dir,
                kind,
                &original_name,
                &content_type,
                &bytes,
            )
            .await
            .map_err(|e| AppError::Validation(e.to_string()))?;
            match kind {
                MediaKind::Image => image_count += 1,
                MediaKind::Video => video_count += 1,
            }
            files.push(saved);
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| AppError::Validation(format!("读取表单字段失败: {e}")))?;
        match name.as_str() {
            "title" => form.title = text,
            "content" => form.content = text,
            "difficulty" => form.difficulty = text,
            "type" => form.kind = text,
            "game_id" => {
                form.game_id = Some(
                    text.parse()
                        .map_err(|_| AppError::Validation("game_id 必须是数字".to_string()))?,
                );
            }
            // 未知字段忽略，前端多传不致命
            _ => {}
        }
    }
    Ok(())
}

/// `DELETE /api/strategies/:id`，只有作者本人可删
pub async fn delete_strategy(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let strategy: super::models::Strategy = state
        .store
        .find_by_pk(id)
        .await?
        .ok_or_else(|| AppError::NotFound("攻略不存在".to_string()))?;
    if strategy.user_id != auth.id {
        return Err(AppError::Forbidden("无权删除该攻略".to_string()));
    }

    let counts = service::remove(&state.store, &state.config.upload_dir, id).await?;
    Ok(Json(json!({
        "message": "攻略已删除",
        "removed": counts
    })))
}

/// `GET /api/tags`
pub async fn list_tags(State(state): State<AppState>) -> AppResult<Json<Vec<Tag>>> {
    let tags: Vec<Tag> = state.store.find_all(&Query::new().order_asc("name")).await?;
    Ok(Json(tags))
}
