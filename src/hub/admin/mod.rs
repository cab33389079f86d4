//! 管理端域：不透明会话、角色闸门与操作日志

pub mod models;
pub mod routes;
pub mod service;

pub use models::{Admin, AdminLog, AdminSession, PublicAdmin};
pub use service::AdminAuth;
