//! 游戏域：浏览、检索、创建

pub mod models;
pub mod routes;

pub use models::Game;
