//! 用户认证：bcrypt 口令散列 + JWT 会话

pub mod models;
pub mod routes;
pub mod token;

pub use models::{PublicUser, User};
pub use token::AuthUser;
