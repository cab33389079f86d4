//! 进程级共享状态

use crate::hub::config::Config;
use crate::hub::store::{FallbackStore, SupabaseClient};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// 注入到所有路由的共享状态，`Clone` 只复制 `Arc`
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FallbackStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let store = match config.supabase() {
            Some((url, key)) => {
                info!("[State] 远程存储已配置: {}", url);
                FallbackStore::new(SupabaseClient::new(url, key)?)
            }
            None => {
                warn!("[State] 未配置 Supabase，服务以纯内存模式运行（数据不持久）");
                FallbackStore::local_only()
            }
        };
        Ok(Self {
            store: Arc::new(store),
            config: Arc::new(config),
        })
    }

    /// 测试用：空内存存储 + 固定密钥
    #[cfg(test)]
    pub fn for_tests(upload_dir: std::path::PathBuf) -> Self {
        Self {
            store: Arc::new(FallbackStore::empty()),
            config: Arc::new(Config {
                port: 0,
                supabase_url: None,
                supabase_anon_key: None,
                secret_key: "test-secret".to_string(),
                upload_dir,
            }),
        }
    }
}
