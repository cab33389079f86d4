//! 社区路由：帖子列表、详情、发帖、评论与点赞

use super::models::{CommunityChannel, CommunityComment, CommunityMessage, CommunityPost};
use crate::hub::auth::{AuthUser, PublicUser, User};
use crate::hub::error::{AppError, AppResult};
use crate::hub::state::AppState;
use crate::hub::store::{Cond, Query};
use axum::extract::{Path, Query as UrlQuery, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/:id", get(get_post))
        .route("/posts/:id/comments", post(create_comment))
        .route("/posts/:id/like", post(like_post))
        .route("/channels", get(list_channels).post(create_channel))
        .route(
            "/channels/:id/messages",
            get(list_channel_messages).post(send_channel_message),
        )
}

#[derive(Debug, Deserialize, Default)]
pub struct ListPostsQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub search: Option<String>,
}

/// `GET /api/community/posts?category=&page=&limit=&search=`
pub async fn list_posts(
    State(state): State<AppState>,
    UrlQuery(params): UrlQuery<ListPostsQuery>,
) -> AppResult<Json<Value>> {
    let limit = params.limit.unwrap_or(10).clamp(1, 50);
    let page = params.page.unwrap_or(1).max(1);

    let mut conds = Vec::new();
    if let Some(category) = params.category.filter(|c| !c.is_empty()) {
        conds.push(Cond::Eq("category", category.into()));
    }
    if let Some(search) = params.search.filter(|s| !s.is_empty()) {
        conds.push(Cond::Or(vec![
            Cond::Contains("title", search.clone()),
            Cond::Contains("content", search),
        ]));
    }

    let total = state
        .store
        .count::<CommunityPost>(&Query {
            conds: conds.clone(),
            ..Query::default()
        })
        .await?;
    let posts: Vec<CommunityPost> = state
        .store
        .find_all(&Query {
            conds,
            order_by: Some(("created_at", crate::hub::store::SortDir::Desc)),
            limit: Some(limit),
            offset: Some(page.saturating_sub(1).saturating_mul(limit)),
        })
        .await?;
    Ok(Json(json!({ "posts": posts, "total": total })))
}

/// `GET /api/community/posts/:id`：帖子 + 评论，命中即浏览数加一
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let mut post: CommunityPost = state
        .store
        .find_by_pk(id)
        .await?
        .ok_or_else(|| AppError::NotFound("帖子不存在".to_string()))?;
    state.store.increment::<CommunityPost>(id, "view_count", 1).await?;
    post.view_count += 1;

    let comments: Vec<CommunityComment> = state
        .store
        .find_all(&Query::new().eq("post_id", id).order_asc("created_at"))
        .await?;
    Ok(Json(json!({ "post": post, "comments": comments })))
}

#[derive(Debug, Deserialize)]
pub struct CreatePostBody {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
}

/// `POST /api/community/posts`
pub async fn create_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreatePostBody>,
) -> AppResult<(StatusCode, Json<CommunityPost>)> {
    if body.title.trim().is_empty() || body.content.trim().is_empty() {
        return Err(AppError::Validation("标题和内容不能为空".to_string()));
    }
    let post = state
        .store
        .create(CommunityPost {
            id: 0,
            title: body.title.trim().to_string(),
            content: body.content.trim().to_string(),
            category: if body.category.is_empty() {
                "general".to_string()
            } else {
                body.category
            },
            user_id: auth.id,
            view_count: 0,
            comment_count: 0,
            like_count: 0,
            created_at: Some(chrono::Utc::now()),
        })
        .await?;
    info!("[Community] {} 发帖: {} (id={})", auth.username, post.title, post.id);
    Ok((StatusCode::CREATED, Json(post)))
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentBody {
    #[serde(default)]
    pub content: String,
}

/// `POST /api/community/posts/:id/comments`：写评论并把帖子评论数加一
pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<i64>,
    Json(body): Json<CreateCommentBody>,
) -> AppResult<(StatusCode, Json<CommunityComment>)> {
    if body.content.trim().is_empty() {
        return Err(AppError::Validation("评论内容不能为空".to_string()));
    }
    let post: Option<CommunityPost> = state.store.find_by_pk(post_id).await?;
    if post.is_none() {
        return Err(AppError::NotFound("帖子不存在".to_string()));
    }

    let comment = state
        .store
        .create(CommunityComment {
            id: 0,
            post_id,
            user_id: auth.id,
            content: body.content.trim().to_string(),
            like_count: 0,
            created_at: Some(chrono::Utc::now()),
        })
        .await?;
    state
        .store
        .increment::<CommunityPost>(post_id, "comment_count", 1)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// `POST /api/community/posts/:id/like`：返回加一后的点赞数
pub async fn like_post(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let post: CommunityPost = state
        .store
        .find_by_pk(id)
        .await?
        .ok_or_else(|| AppError::NotFound("帖子不存在".to_string()))?;
    state.store.increment::<CommunityPost>(id, "like_count", 1).await?;
    Ok(Json(json!({ "like_count": post.like_count + 1 })))
}

/// `GET /api/community/channels`：新建的排前面
pub async fn list_channels(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CommunityChannel>>> {
    let channels: Vec<CommunityChannel> = state
        .store
        .find_all(&Query::new().order_desc("created_at"))
        .await?;
    Ok(Json(channels))
}

#[derive(Debug, Deserialize)]
pub struct CreateChannelBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// `POST /api/community/channels`
pub async fn create_channel(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateChannelBody>,
) -> AppResult<(StatusCode, Json<CommunityChannel>)> {
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("频道名称不能为空".to_string()));
    }
    let now = chrono::Utc::now();
    let channel = state
        .store
        .create(CommunityChannel {
            id: 0,
            name: body.name.trim().to_string(),
            description: body.description,
            created_by: auth.id,
            created_at: Some(now),
            updated_at: Some(now),
        })
        .await?;
    info!("[Community] {} 创建频道: {} (id={})", auth.username, channel.name, channel.id);
    Ok((StatusCode::CREATED, Json(channel)))
}

/// 频道消息 + 发送者档案
#[derive(Debug, Serialize)]
pub struct ChannelMessageEntry {
    #[serde(flatten)]
    pub message: CommunityMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicUser>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ChannelMessagesQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

/// `GET /api/community/channels/:id/messages?limit=&offset=`：最新的在前
pub async fn list_channel_messages(
    State(state): State<AppState>,
    Path(channel_id): Path<i64>,
    UrlQuery(params): UrlQuery<ChannelMessagesQuery>,
) -> AppResult<Json<Value>> {
    let channel: Option<CommunityChannel> = state.store.find_by_pk(channel_id).await?;
    if channel.is_none() {
        return Err(AppError::NotFound("频道不存在".to_string()));
    }
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let offset = params.offset.unwrap_or(0);

    let by_channel = Query::new().eq("channel_id", channel_id);
    let total = state.store.count::<CommunityMessage>(&by_channel).await?;
    let messages: Vec<CommunityMessage> = state
        .store
        .find_all(
            &Query::new()
                .eq("channel_id", channel_id)
                .order_desc("created_at")
                .limit(limit)
                .offset(offset),
        )
        .await?;

    let mut entries = Vec::with_capacity(messages.len());
    for message in messages {
        let user: Option<User> = state.store.find_by_pk(message.user_id).await?;
        entries.push(ChannelMessageEntry {
            message,
            user: user.map(PublicUser::from),
        });
    }
    Ok(Json(json!({
        "messages": entries,
        "total": total,
        "limit": limit,
        "offset": offset,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SendChannelMessageBody {
    #[serde(default)]
    pub content: String,
}

/// `POST /api/community/channels/:id/messages`
pub async fn send_channel_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel_id): Path<i64>,
    Json(body): Json<SendChannelMessageBody>,
) -> AppResult<(StatusCode, Json<ChannelMessageEntry>)> {
    if body.content.trim().is_empty() {
        return Err(AppError::Validation("消息内容不能为空".to_string()));
    }
    let channel: Option<CommunityChannel> = state.store.find_by_pk(channel_id).await?;
    if channel.is_none() {
        return Err(AppError::NotFound("频道不存在".to_string()));
    }

    let message = state
        .store
        .create(CommunityMessage {
            id: 0,
            channel_id,
            user_id: auth.id,
            content: body.content.trim().to_string(),
            created_at: Some(chrono::Utc::now()),
        })
        .await?;
    let user: Option<User> = state.store.find_by_pk(auth.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ChannelMessageEntry {
            message,
            user: user.map(PublicUser::from),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> AppState {
        AppState::for_tests(std::env::temp_dir())
    }

    fn auth(id: i64) -> AuthUser {
        AuthUser {
            id,
            username: format!("用户{id}"),
        }
    }

    async fn seed_post(state: &AppState, title: &str, category: &str) -> i64 {
        let (_, post) = create_post(
            State(state.clone()),
            auth(1),
            Json(CreatePostBody {
                title: title.to_string(),
                content: "正文内容".to_string(),
                category: category.to_string(),
            }),
        )
        .await
        .expect("发帖");
        post.0.id
    }

    #[tokio::test]
    async fn list_filters_by_category_with_total() {
        let state = test_state();
        seed_post(&state, "深渊阵容讨论", "strategy").await;
        seed_post(&state, "厨力放送", "offtopic").await;

        let body = list_posts(
            State(state),
            UrlQuery(ListPostsQuery {
                category: Some("strategy".to_string()),
                ..Default::default()
            }),
        )
        .await
        .expect("列表");
        assert_eq!(body.0["total"], 1);
        assert_eq!(body.0["posts"][0]["title"], "深渊阵容讨论");
    }

    #[tokio::test]
    async fn detail_bumps_view_count_and_lists_comments() {
        let state = test_state();
        let id = seed_post(&state, "求个王者上分搭子", "general").await;

        create_comment(
            State(state.clone()),
            auth(2),
            Path(id),
            Json(CreateCommentBody {
                content: "带我一个".to_string(),
            }),
        )
        .await
        .expect("评论");

        let body = get_post(State(state.clone()), Path(id)).await.expect("详情");
        assert_eq!(body.0["post"]["view_count"], 1);
        assert_eq!(body.0["post"]["comment_count"], 1);
        assert_eq!(body.0["comments"][0]["content"], "带我一个");
    }

    #[tokio::test]
    async fn like_returns_new_count() {
        let state = test_state();
        let id = seed_post(&state, "点赞测试", "general").await;

        let first = like_post(State(state.clone()), auth(2), Path(id)).await.expect("点赞");
        assert_eq!(first.0["like_count"], 1);
        let second = like_post(State(state), auth(3), Path(id)).await.expect("再点赞");
        assert_eq!(second.0["like_count"], 2);
    }

    #[tokio::test]
    async fn channel_messages_carry_sender_profile() {
        let state = test_state();
        let user = state
            .store
            .create(User {
                id: 0,
                username: "频道常客".to_string(),
                password: "hash".to_string(),
                email: None,
                online_status: "online".to_string(),
                last_active: None,
                created_at: Some(chrono::Utc::now()),
                updated_at: Some(chrono::Utc::now()),
            })
            .await
            .expect("插入用户");
        let (_, channel) = create_channel(
            State(state.clone()),
            AuthUser {
                id: user.id,
                username: user.username.clone(),
            },
            Json(CreateChannelBody {
                name: "综合讨论".to_string(),
                description: Some("杂谈".to_string()),
            }),
        )
        .await
        .expect("建频道");

        send_channel_message(
            State(state.clone()),
            AuthUser {
                id: user.id,
                username: user.username.clone(),
            },
            Path(channel.0.id),
            Json(SendChannelMessageBody {
                content: "大家好".to_string(),
            }),
        )
        .await
        .expect("发消息");

        let body = list_channel_messages(
            State(state),
            Path(channel.0.id),
            UrlQuery(ChannelMessagesQuery::default()),
        )
        .await
        .expect("拉消息");
        assert_eq!(body.0["total"], 1);
        assert_eq!(body.0["messages"][0]["content"], "大家好");
        assert_eq!(body.0["messages"][0]["user"]["username"], "频道常客");
        // 密码散列不能跟着档案漏出去
        assert!(body.0["messages"][0]["user"]["password"].is_null());
    }

    #[tokio::test]
    async fn channel_requires_name_and_message_requires_channel() {
        let state = test_state();
        let nameless = create_channel(
            State(state.clone()),
            auth(1),
            Json(CreateChannelBody {
                name: "  ".to_string(),
                description: None,
            }),
        )
        .await;
        assert!(matches!(nameless, Err(AppError::Validation(_))));

        let orphan = send_channel_message(
            State(state),
            auth(1),
            Path(404),
            Json(SendChannelMessageBody {
                content: "有人吗".to_string(),
            }),
        )
        .await;
        assert!(matches!(orphan, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn comment_on_missing_post_is_404() {
        let state = test_state();
        let result = create_comment(
            State(state),
            auth(1),
            Path(42),
            Json(CreateCommentBody {
                content: "评论".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
