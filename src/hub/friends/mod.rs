//! 好友域：申请、关系对与私聊

pub mod models;
pub mod routes;

pub use models::{ChatMessage, FriendRequest, Friendship};
