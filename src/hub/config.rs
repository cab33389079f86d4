//! 运行配置
//!
//! 全部来自环境变量：`SUPABASE_URL` / `SUPABASE_ANON_KEY`（成对出现，
//! 缺省时服务以纯内存模式运行）、`SECRET_KEY`（JWT 签名密钥，必填）、
//! `PORT`（默认 3000）、`UPLOAD_DIR`（默认 `uploads`）。

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use tracing::warn;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub secret_key: String,
    pub upload_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let secret_key = env::var("SECRET_KEY").context("缺少环境变量 SECRET_KEY")?;
        let port = match env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().context("PORT 不是合法端口号")?,
            Err(_) => 3000,
        };

        let supabase_url = env::var("SUPABASE_URL").ok().filter(|s| !s.is_empty());
        let supabase_anon_key = env::var("SUPABASE_ANON_KEY").ok().filter(|s| !s.is_empty());
        if supabase_url.is_some() != supabase_anon_key.is_some() {
            warn!("[Config] SUPABASE_URL 与 SUPABASE_ANON_KEY 必须成对配置，已忽略远程存储");
        }

        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        Ok(Self {
            port,
            supabase_url,
            supabase_anon_key,
            secret_key,
            upload_dir,
        })
    }

    /// 远程存储配置，仅当 URL 与密钥都存在时有效
    pub fn supabase(&self) -> Option<(&str, &str)> {
        match (&self.supabase_url, &self.supabase_anon_key) {
            (Some(url), Some(key)) => Some((url.as_str(), key.as_str())),
            _ => None,
        }
    }
}
