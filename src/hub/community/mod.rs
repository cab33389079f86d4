//! 社区域：帖子、评论、点赞与聊天频道

pub mod models;
pub mod routes;

pub use models::{CommunityChannel, CommunityComment, CommunityMessage, CommunityPost};
