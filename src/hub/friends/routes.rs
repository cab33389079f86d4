//! 好友路由：好友列表、申请流转、删除与私聊

use super::models::{ChatMessage, FriendRequest, Friendship};
use crate::hub::auth::{AuthUser, PublicUser, User};
use crate::hub::error::{AppError, AppResult};
use crate::hub::state::AppState;
use crate::hub::store::{FallbackStore, Query};
use axum::extract::{Path, Query as UrlQuery, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_friends))
        .route("/requests", get(list_requests).post(send_request))
        .route("/requests/:id/accept", post(accept_request))
        .route("/requests/:id/reject", post(reject_request))
        .route("/messages/unread", get(unread_counts))
        .route("/:friend_id", delete(remove_friend))
        .route("/:friend_id/messages", get(get_messages).post(send_message))
}

/// 好友列表里的一项：关系行 + 对方档案
#[derive(Debug, Serialize)]
pub struct FriendEntry {
    pub friendship_id: i64,
    pub friend: PublicUser,
    pub since: Option<chrono::DateTime<chrono::Utc>>,
}

/// `GET /api/friends`：在线的排前面，其余按最近活跃时间倒序
pub async fn list_friends(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<FriendEntry>>> {
    let rows: Vec<Friendship> = state
        .store
        .find_all(&Query::new().eq("user_id", auth.id).eq("status", "accepted"))
        .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(friend) = state.store.find_by_pk::<User>(row.friend_id).await? else {
            // 好友账号已删、关系行残留，跳过而不是整个列表报错
            continue;
        };
        entries.push(FriendEntry {
            friendship_id: row.id,
            friend: friend.into(),
            since: row.created_at,
        });
    }
    entries.sort_by(|a, b| {
        let online = |u: &PublicUser| u.online_status == "online";
        online(&b.friend)
            .cmp(&online(&a.friend))
            .then(b.friend.last_active.cmp(&a.friend.last_active))
    });
    Ok(Json(entries))
}

#[derive(Debug, Deserialize, Default)]
pub struct ListRequestsQuery {
    /// `received`（默认）或 `sent`
    #[serde(rename = "type", default)]
    pub direction: Option<String>,
}

/// 申请列表里的一项：申请行 + 对端档案（收到的带发件人，发出的带收件人）
#[derive(Debug, Serialize)]
pub struct RequestEntry {
    #[serde(flatten)]
    pub request: FriendRequest,
    pub user: PublicUser,
}

/// `GET /api/friends/requests?type=received|sent`
pub async fn list_requests(
    State(state): State<AppState>,
    auth: AuthUser,
    UrlQuery(params): UrlQuery<ListRequestsQuery>,
) -> AppResult<Json<Vec<RequestEntry>>> {
    let sent = params.direction.as_deref() == Some("sent");
    let own_side = if sent { "sender_id" } else { "receiver_id" };
    let requests: Vec<FriendRequest> = state
        .store
        .find_all(
            &Query::new()
                .eq(own_side, auth.id)
                .eq("status", "pending")
                .order_desc("created_at"),
        )
        .await?;

    let mut entries = Vec::with_capacity(requests.len());
    for request in requests {
        let peer_id = if sent { request.receiver_id } else { request.sender_id };
        let Some(peer) = state.store.find_by_pk::<User>(peer_id).await? else {
            continue;
        };
        entries.push(RequestEntry {
            request,
            user: peer.into(),
        });
    }
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct SendRequestBody {
    pub receiver_id: i64,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /api/friends/requests`
pub async fn send_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<SendRequestBody>,
) -> AppResult<(StatusCode, Json<FriendRequest>)> {
    if body.receiver_id == auth.id {
        return Err(AppError::Validation("不能添加自己为好友".to_string()));
    }
    let receiver: Option<User> = state.store.find_by_pk(body.receiver_id).await?;
    if receiver.is_none() {
        return Err(AppError::NotFound("用户不存在".to_string()));
    }
    if friendship_between(&state.store, auth.id, body.receiver_id).await? {
        return Err(AppError::Validation("你们已经是好友了".to_string()));
    }
    if pending_between(&state.store, auth.id, body.receiver_id).await? {
        return Err(AppError::Validation("好友申请已存在".to_string()));
    }

    let request = state
        .store
        .create(FriendRequest {
            id: 0,
            sender_id: auth.id,
            receiver_id: body.receiver_id,
            message: body.message,
            status: "pending".to_string(),
            created_at: Some(chrono::Utc::now()),
        })
        .await?;
    info!("[Friends] {} 发出好友申请 -> 用户 {}", auth.username, body.receiver_id);
    Ok((StatusCode::CREATED, Json(request)))
}

/// `POST /api/friends/requests/:id/accept`：置 accepted 并成对写入关系行
pub async fn accept_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    let request = pending_request_for(&state.store, id, auth.id).await?;

    state
        .store
        .update::<FriendRequest>(&json!({ "status": "accepted" }), &Query::new().eq("id", id))
        .await?;
    let now = chrono::Utc::now();
    for (user_id, friend_id) in [
        (request.sender_id, request.receiver_id),
        (request.receiver_id, request.sender_id),
    ] {
        state
            .store
            .create(Friendship {
                id: 0,
                user_id,
                friend_id,
                status: "accepted".to_string(),
                created_at: Some(now),
            })
            .await?;
    }
    info!("[Friends] 用户 {} 接受了申请 {}", auth.id, id);
    Ok(Json(json!({ "message": "已添加为好友" })))
}

/// `POST /api/friends/requests/:id/reject`
pub async fn reject_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    pending_request_for(&state.store, id, auth.id).await?;
    state
        .store
        .update::<FriendRequest>(&json!({ "status": "rejected" }), &Query::new().eq("id", id))
        .await?;
    Ok(Json(json!({ "message": "已拒绝该申请" })))
}

/// `DELETE /api/friends/:friend_id`：删掉关系对的两行
pub async fn remove_friend(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(friend_id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    let mut removed = state
        .store
        .destroy::<Friendship>(&Query::new().eq("user_id", auth.id).eq("friend_id", friend_id))
        .await?;
    removed += state
        .store
        .destroy::<Friendship>(&Query::new().eq("user_id", friend_id).eq("friend_id", auth.id))
        .await?;
    if removed == 0 {
        return Err(AppError::NotFound("好友关系不存在".to_string()));
    }
    Ok(Json(json!({ "message": "已删除好友" })))
}

/// `GET /api/friends/:friend_id/messages`：按时间正序，顺手把对方发来的标记已读
pub async fn get_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(friend_id): Path<i64>,
) -> AppResult<Json<Vec<ChatMessage>>> {
    // 过滤语言表达不了 (a AND b) OR (c AND d)，两个方向各查一次再合并
    let mut messages: Vec<ChatMessage> = state
        .store
        .find_all(&Query::new().eq("sender_id", auth.id).eq("receiver_id", friend_id))
        .await?;
    let incoming: Vec<ChatMessage> = state
        .store
        .find_all(&Query::new().eq("sender_id", friend_id).eq("receiver_id", auth.id))
        .await?;
    messages.extend(incoming);
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    state
        .store
        .update::<ChatMessage>(
            &json!({ "is_read": true }),
            &Query::new()
                .eq("sender_id", friend_id)
                .eq("receiver_id", auth.id)
                .eq("is_read", false),
        )
        .await?;
    Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    #[serde(default)]
    pub content: String,
}

/// `POST /api/friends/:friend_id/messages`
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(friend_id): Path<i64>,
    Json(body): Json<SendMessageBody>,
) -> AppResult<(StatusCode, Json<ChatMessage>)> {
    if body.content.trim().is_empty() {
        return Err(AppError::Validation("消息内容不能为空".to_string()));
    }
    if !friendship_between(&state.store, auth.id, friend_id).await? {
        return Err(AppError::Forbidden("只能给好友发消息".to_string()));
    }
    let message = state
        .store
        .create(ChatMessage {
            id: 0,
            sender_id: auth.id,
            receiver_id: friend_id,
            content: body.content.trim().to_string(),
            message_type: "text".to_string(),
            is_read: false,
            created_at: Some(chrono::Utc::now()),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Debug, Deserialize, Default)]
pub struct SearchUsersQuery {
    #[serde(default)]
    pub query: Option<String>,
}

/// `GET /api/users/search?query=`：按用户名模糊找人（加好友入口）
pub async fn search_users(
    State(state): State<AppState>,
    UrlQuery(params): UrlQuery<SearchUsersQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let needle = params.query.unwrap_or_default();
    if needle.chars().count() < 2 {
        return Err(AppError::Validation("搜索关键词至少需要2个字符".to_string()));
    }
    let users: Vec<User> = state
        .store
        .find_all(&Query::new().contains("username", needle).limit(10))
        .await?;
    let users: Vec<PublicUser> = users.into_iter().map(PublicUser::from).collect();
    Ok(Json(json!({ "users": users })))
}

/// 每个发信人的未读消息数
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct UnreadCount {
    pub sender_id: i64,
    pub count: u64,
}

/// `GET /api/friends/messages/unread`：按发信人分组统计
pub async fn unread_counts(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    let unread: Vec<ChatMessage> = state
        .store
        .find_all(&Query::new().eq("receiver_id", auth.id).eq("is_read", false))
        .await?;

    // 过滤语言没有 group by，在应用层聚合
    let mut by_sender: std::collections::BTreeMap<i64, u64> = std::collections::BTreeMap::new();
    for message in unread {
        *by_sender.entry(message.sender_id).or_insert(0) += 1;
    }
    let counts: Vec<UnreadCount> = by_sender
        .into_iter()
        .map(|(sender_id, count)| UnreadCount { sender_id, count })
        .collect();
    Ok(Json(json!({ "unread_counts": counts })))
}

async fn friendship_between(store: &FallbackStore, a: i64, b: i64) -> AppResult<bool> {
    let rows: Vec<Friendship> = store
        .find_all(
            &Query::new()
                .eq("user_id", a)
                .eq("friend_id", b)
                .eq("status", "accepted")
                .limit(1),
        )
        .await?;
    Ok(!rows.is_empty())
}

async fn pending_between(store: &FallbackStore, a: i64, b: i64) -> AppResult<bool> {
    for (sender, receiver) in [(a, b), (b, a)] {
        let rows: Vec<FriendRequest> = store
            .find_all(
                &Query::new()
                    .eq("sender_id", sender)
                    .eq("receiver_id", receiver)
                    .eq("status", "pending")
                    .limit(1),
            )
            .await?;
        if !rows.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// 取属于当前用户的待处理申请；不存在或不是发给自己的统一按 404 处理
async fn pending_request_for(
    store: &FallbackStore,
    id: i64,
    receiver_id: i64,
) -> AppResult<FriendRequest> {
    let request: FriendRequest = store
        .find_by_pk(id)
        .await?
        .ok_or_else(|| AppError::NotFound("好友申请不存在".to_string()))?;
    if request.receiver_id != receiver_id || request.status != "pending" {
        return Err(AppError::NotFound("好友申请不存在".to_string()));
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> AppState {
        AppState::for_tests(std::env::temp_dir())
    }

    async fn seed_user(state: &AppState, name: &str, online: &str) -> i64 {
        state
            .store
            .create(User {
                id: 0,
                username: name.to_string(),
                password: "hash".to_string(),
                email: None,
                online_status: online.to_string(),
                last_active: Some(chrono::Utc::now()),
                created_at: Some(chrono::Utc::now()),
                updated_at: Some(chrono::Utc::now()),
            })
            .await
            .expect("插入用户")
            .id
    }

    fn auth(id: i64) -> AuthUser {
        AuthUser {
            id,
            username: format!("用户{id}"),
        }
    }

    #[tokio::test]
    async fn request_to_self_is_rejected() {
        let state = test_state();
        let me = seed_user(&state, "阿青", "online").await;
        let result = send_request(
            State(state),
            auth(me),
            Json(SendRequestBody {
                receiver_id: me,
                message: None,
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn accept_creates_symmetric_pair() {
        let state = test_state();
        let a = seed_user(&state, "阿青", "online").await;
        let b = seed_user(&state, "小飞", "offline").await;

        let (status, request) = send_request(
            State(state.clone()),
            auth(a),
            Json(SendRequestBody {
                receiver_id: b,
                message: Some("一起打深渊".to_string()),
            }),
        )
        .await
        .expect("发出申请");
        assert_eq!(status, StatusCode::CREATED);

        // 只有收件人能接受
        let wrong = accept_request(State(state.clone()), auth(a), Path(request.0.id)).await;
        assert!(matches!(wrong, Err(AppError::NotFound(_))));

        accept_request(State(state.clone()), auth(b), Path(request.0.id))
            .await
            .expect("接受申请");

        let a_list = list_friends(State(state.clone()), auth(a)).await.expect("a 的好友");
        let b_list = list_friends(State(state.clone()), auth(b)).await.expect("b 的好友");
        assert_eq!(a_list.0.len(), 1);
        assert_eq!(b_list.0.len(), 1);
        assert_eq!(a_list.0[0].friend.id, b);

        // 接受后不允许重复申请
        let dup = send_request(
            State(state),
            auth(a),
            Json(SendRequestBody {
                receiver_id: b,
                message: None,
            }),
        )
        .await;
        assert!(matches!(dup, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn messages_marked_read_on_fetch() {
        let state = test_state();
        let a = seed_user(&state, "阿青", "online").await;
        let b = seed_user(&state, "小飞", "online").await;
        for (u, f) in [(a, b), (b, a)] {
            state
                .store
                .create(Friendship {
                    id: 0,
                    user_id: u,
                    friend_id: f,
                    status: "accepted".to_string(),
                    created_at: Some(chrono::Utc::now()),
                })
                .await
                .expect("建立好友关系");
        }

        send_message(
            State(state.clone()),
            auth(a),
            Path(b),
            Json(SendMessageBody {
                content: "周末开黑吗".to_string(),
            }),
        )
        .await
        .expect("发消息");

        // b 拉取后，a 发来的消息应置为已读
        let fetched = get_messages(State(state.clone()), auth(b), Path(a)).await.expect("拉取");
        assert_eq!(fetched.0.len(), 1);
        assert!(!fetched.0[0].is_read);

        let again = get_messages(State(state), auth(b), Path(a)).await.expect("再次拉取");
        assert!(again.0[0].is_read);
    }

    #[tokio::test]
    async fn search_needs_two_chars_and_hides_password() {
        let state = test_state();
        seed_user(&state, "深渊玩家", "online").await;

        let short = search_users(
            State(state.clone()),
            UrlQuery(SearchUsersQuery {
                query: Some("深".to_string()),
            }),
        )
        .await;
        assert!(matches!(short, Err(AppError::Validation(_))));

        let body = search_users(
            State(state),
            UrlQuery(SearchUsersQuery {
                query: Some("深渊".to_string()),
            }),
        )
        .await
        .expect("搜索");
        assert_eq!(body.0["users"][0]["username"], "深渊玩家");
        assert!(body.0["users"][0]["password"].is_null());
    }

    #[tokio::test]
    async fn unread_counts_grouped_by_sender() {
        let state = test_state();
        let me = seed_user(&state, "收件人", "online").await;
        let a = seed_user(&state, "发信人甲", "online").await;
        let b = seed_user(&state, "发信人乙", "online").await;
        for (sender, n) in [(a, 2), (b, 1)] {
            for i in 0..n {
                state
                    .store
                    .create(ChatMessage {
                        id: 0,
                        sender_id: sender,
                        receiver_id: me,
                        content: format!("消息 {i}"),
                        message_type: "text".to_string(),
                        is_read: false,
                        created_at: Some(chrono::Utc::now()),
                    })
                    .await
                    .expect("写消息");
            }
        }

        let body = unread_counts(State(state), auth(me)).await.expect("统计");
        let counts = body.0["unread_counts"].as_array().expect("数组");
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0]["sender_id"], a);
        assert_eq!(counts[0]["count"], 2);
        assert_eq!(counts[1]["count"], 1);
    }

    #[tokio::test]
    async fn remove_friend_deletes_both_rows() {
        let state = test_state();
        let a = seed_user(&state, "阿青", "online").await;
        let b = seed_user(&state, "小飞", "online").await;
        for (u, f) in [(a, b), (b, a)] {
            state
                .store
                .create(Friendship {
                    id: 0,
                    user_id: u,
                    friend_id: f,
                    status: "accepted".to_string(),
                    created_at: Some(chrono::Utc::now()),
                })
                .await
                .expect("建立好友关系");
        }

        remove_friend(State(state.clone()), auth(a), Path(b)).await.expect("删除");
        let b_list = list_friends(State(state.clone()), auth(b)).await.expect("b 的好友");
        assert!(b_list.0.is_empty());

        let again = remove_friend(State(state), auth(a), Path(b)).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }
}
