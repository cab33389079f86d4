//! 游戏攻略分享平台后端
//!
//! 域划分：`auth` 用户认证、`games` 游戏库、`strategies` 攻略与媒体附件、
//! `friends` 好友与私聊、`community` 社区帖子、`userdata` 收藏与历史、
//! `admin` 管理端；横切层：`store` 双后端存储、`media` 文件管道、
//! `config` / `state` / `error` / `server`。

pub mod admin;
pub mod auth;
pub mod community;
pub mod config;
pub mod error;
pub mod friends;
pub mod games;
pub mod media;
pub mod server;
pub mod state;
pub mod store;
pub mod strategies;
pub mod userdata;
