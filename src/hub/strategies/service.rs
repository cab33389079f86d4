//! 攻略域业务逻辑：校验、媒体行拼装、创建回滚与删除级联

use super::models::{MediaImage, MediaVideo, Strategy, StrategyTag};
use super::types::{ListStrategiesQuery, MediaStats, RemovedCounts, StrategyForm, StrategyWithMedia};
use crate::hub::error::{AppError, AppResult};
use crate::hub::games::Game;
use crate::hub::media::upload::{self, MediaKind, SavedFile};
use crate::hub::store::{Cond, FallbackStore, Query};
use std::path::Path;
use tracing::{info, warn};

/// 标题上限按字符计，不按字节
const MAX_TITLE_CHARS: usize = 100;
/// 正文下限，同样按字符计（中文正文 50 字节远不够 50 字）
const MIN_CONTENT_CHARS: usize = 50;

/// 文本字段与外键的前置校验，任何媒体行写入之前必须先过这道关
pub async fn validate(store: &FallbackStore, form: &StrategyForm) -> AppResult<()> {
    let title = form.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("攻略标题不能为空".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation("攻略标题不能超过100个字符".to_string()));
    }
    if form.content.trim().chars().count() < MIN_CONTENT_CHARS {
        return Err(AppError::Validation("攻略内容至少需要50个字符".to_string()));
    }
    let game_id = form
        .game_id
        .ok_or_else(|| AppError::Validation("必须选择关联的游戏".to_string()))?;
    let game: Option<Game> = store.find_by_pk(game_id).await?;
    if game.is_none() {
        return Err(AppError::NotFound("关联的游戏不存在".to_string()));
    }
    Ok(())
}

fn list_conds(params: &ListStrategiesQuery) -> Vec<Cond> {
    let mut conds = vec![Cond::Eq(
        "status",
        params
            .status
            .clone()
            .unwrap_or_else(|| "published".to_string())
            .into(),
    )];
    if let Some(game_id) = params.game_id {
        conds.push(Cond::Eq("game_id", game_id.into()));
    }
    if let Some(difficulty) = params.difficulty.clone().filter(|d| !d.is_empty()) {
        conds.push(Cond::Eq("difficulty", difficulty.into()));
    }
    if let Some(search) = params.search.clone().filter(|s| !s.is_empty()) {
        conds.push(Cond::Or(vec![
            Cond::Contains("title", search.clone()),
            Cond::Contains("content", search),
        ]));
    }
    conds
}

/// 分页列出攻略，返回（当前页 + 媒体 URL，总条数）
pub async fn list(
    store: &FallbackStore,
    params: &ListStrategiesQuery,
) -> AppResult<(Vec<StrategyWithMedia>, u64)> {
    let limit = params.limit.unwrap_or(10).clamp(1, 50);
    let page = params.page.unwrap_or(1).max(1);
    let conds = list_conds(params);

    let mut query = Query {
        conds: conds.clone(),
        order_by: None,
        limit: Some(limit),
        // page 由调用方传入，乘法不能假设不溢出
        offset: Some(page.saturating_sub(1).saturating_mul(limit)),
    };
    query.order_by = Some(match params.sort.as_deref() {
        Some("oldest") => ("created_at", crate::hub::store::SortDir::Asc),
        Some("popular") => ("view_count", crate::hub::store::SortDir::Desc),
        _ => ("created_at", crate::hub::store::SortDir::Desc),
    });

    let total = store
        .count::<Strategy>(&Query {
            conds,
            ..Query::default()
        })
        .await?;
    let strategies: Vec<Strategy> = store.find_all(&query).await?;

    let mut rows = Vec::with_capacity(strategies.len());
    for strategy in strategies {
        rows.push(with_media(store, strategy, false).await?);
    }
    Ok((rows, total))
}

/// 攻略详情：命中即把 view_count 原子加一，返回值带上加一后的计数
pub async fn detail(store: &FallbackStore, id: i64) -> AppResult<StrategyWithMedia> {
    let strategy: Strategy = store
        .find_by_pk(id)
        .await?
        .ok_or_else(|| AppError::NotFound("攻略不存在".to_string()))?;

    store.increment::<Strategy>(id, "view_count", 1).await?;
    let mut row = with_media(store, strategy, true).await?;
    // 自增已落库，响应里直接展示新值，省一次回读
    row.strategy.view_count += 1;
    Ok(row)
}

/// 创建攻略及其媒体行；任何一步失败都把本次已落盘的文件清掉
pub async fn create(
    store: &FallbackStore,
    form: StrategyForm,
    files: Vec<SavedFile>,
) -> AppResult<StrategyWithMedia> {
    match try_create(store, form, &files).await {
        Ok(row) => Ok(row),
        Err(e) => {
            upload::cleanup(&files).await;
            Err(e)
        }
    }
}

async fn try_create(
    store: &FallbackStore,
    form: StrategyForm,
    files: &[SavedFile],
) -> AppResult<StrategyWithMedia> {
    validate(store, &form).await?;
    let user_id = form
        .user_id
        .ok_or_else(|| AppError::Unauthorized("未登录".to_string()))?;

    let now = chrono::Utc::now();
    let strategy = store
        .create(Strategy {
            id: 0,
            title: form.title.trim().to_string(),
            content: form.content.trim().to_string(),
            game_id: form.game_id.unwrap_or_default(),
            user_id,
            difficulty: if form.difficulty.is_empty() {
                "medium".to_string()
            } else {
                form.difficulty
            },
            kind: if form.kind.is_empty() {
                "guide".to_string()
            } else {
                form.kind
            },
            status: "published".to_string(),
            view_count: 0,
            created_at: Some(now),
            updated_at: Some(now),
        })
        .await?;

    for file in files {
        match file.kind {
            MediaKind::Image => {
                store
                    .create(MediaImage {
                        id: 0,
                        strategy_id: strategy.id,
                        file_path: file.url_path.clone(),
                        file_name: file.file_name.clone(),
                        file_size: file.size,
                        mime_type: file.mime_type.clone(),
                        created_at: Some(now),
                    })
                    .await?;
            }
            MediaKind::Video => {
                store
                    .create(MediaVideo {
                        id: 0,
                        strategy_id: strategy.id,
                        file_path: file.url_path.clone(),
                        file_name: file.file_name.clone(),
                        file_size: file.size,
                        mime_type: file.mime_type.clone(),
                        duration: None,
                        created_at: Some(now),
                    })
                    .await?;
            }
        }
    }

    info!(
        "[Strategy] 创建攻略: {} (id={}, 附件 {} 个)",
        strategy.title,
        strategy.id,
        files.len()
    );
    with_media(store, strategy, true).await
}

/// 删除攻略：先清盘上文件，再删媒体行与标签关联，最后删攻略行。
/// 文件缺失只记告警，级联继续。
pub async fn remove(
    store: &FallbackStore,
    upload_dir: &Path,
    id: i64,
) -> AppResult<RemovedCounts> {
    let strategy: Strategy = store
        .find_by_pk(id)
        .await?
        .ok_or_else(|| AppError::NotFound("攻略不存在".to_string()))?;

    let by_strategy = Query::new().eq("strategy_id", id);
    let images: Vec<MediaImage> = store.find_all(&by_strategy).await?;
    let videos: Vec<MediaVideo> = store.find_all(&by_strategy).await?;

    let mut files_removed = 0u64;
    for (kind, name) in images
        .iter()
        .map(|i| (MediaKind::Image, i.file_name.as_str()))
        .chain(videos.iter().map(|v| (MediaKind::Video, v.file_name.as_str())))
    {
        let path = upload_dir.join(kind.dir()).join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => files_removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("[Strategy] 附件文件已不在磁盘上: {}", path.display());
            }
            Err(e) => warn!("[Strategy] 删除附件文件失败 {}: {}", path.display(), e),
        }
    }

    let mut media_rows = store.destroy::<MediaImage>(&by_strategy).await?;
    media_rows += store.destroy::<MediaVideo>(&by_strategy).await?;
    store.destroy::<StrategyTag>(&by_strategy).await?;
    store.destroy::<Strategy>(&Query::new().eq("id", id)).await?;

    info!(
        "[Strategy] 删除攻略 {} (id={}): 媒体行 {} 条，文件 {} 个",
        strategy.title, id, media_rows, files_removed
    );
    Ok(RemovedCounts {
        media_rows,
        files: files_removed,
    })
}

async fn with_media(
    store: &FallbackStore,
    strategy: Strategy,
    include_stats: bool,
) -> AppResult<StrategyWithMedia> {
    let by_strategy = Query::new().eq("strategy_id", strategy.id).order_asc("id");
    let images: Vec<MediaImage> = store.find_all(&by_strategy).await?;
    let videos: Vec<MediaVideo> = store.find_all(&by_strategy).await?;

    let media_stats = include_stats.then(|| MediaStats {
        image_count: images.len(),
        video_count: videos.len(),
        total_size: images.iter().map(|i| i.file_size).sum::<i64>()
            + videos.iter().map(|v| v.file_size).sum::<i64>(),
    });
    Ok(StrategyWithMedia {
        strategy,
        image_urls: images.into_iter().map(|i| i.file_path).collect(),
        video_urls: videos.into_iter().map(|v| v.file_path).collect(),
        media_stats,
    })
}
