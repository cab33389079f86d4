//! 双后端回退装饰器
//!
//! 每个操作先尝试远程行存储，远程出错（网络、表缺失、约束冲突）时记一条
//! 警告并在内存数据集上重放同一操作。回退成功时错误不会越过本层边界，
//! 只有两边都无法给出结果才向上返回错误；两边都查不到的主键返回 `Ok(None)`。

use super::{Entity, MemoryStore, Query, SupabaseClient};
use anyhow::Result;
use serde_json::Value;
use tracing::warn;

/// 全进程共享一个实例（经 `Arc` 注入各路由），替代原先散落的模块级数组
pub struct FallbackStore {
    remote: Option<SupabaseClient>,
    local: MemoryStore,
}

impl FallbackStore {
    /// 远程 + 内存回退
    pub fn new(remote: SupabaseClient) -> Self {
        Self {
            remote: Some(remote),
            local: MemoryStore::with_seed_data(),
        }
    }

    /// 纯内存模式（未配置 Supabase 时的离线运行）
    pub fn local_only() -> Self {
        Self {
            remote: None,
            local: MemoryStore::with_seed_data(),
        }
    }

    /// 纯内存且不带示例数据（测试用）
    pub fn empty() -> Self {
        Self {
            remote: None,
            local: MemoryStore::new(),
        }
    }

    pub async fn find_all<T: Entity>(&self, query: &Query) -> Result<Vec<T>> {
        if let Some(remote) = &self.remote {
            match remote.find_all::<T>(query).await {
                Ok(rows) => return Ok(rows),
                Err(e) => warn!("[Store] 远程查询 {} 失败，回退到内存数据: {:#}", T::TABLE, e),
            }
        }
        self.local.find_all(query).await
    }

    pub async fn find_by_pk<T: Entity>(&self, id: i64) -> Result<Option<T>> {
        if let Some(remote) = &self.remote {
            match remote.find_by_pk::<T>(id).await {
                Ok(Some(row)) => return Ok(Some(row)),
                // 远程查到空不算失败，但仍到内存里再找一次，
                // 覆盖"行只写进了回退数据集"的降级场景
                Ok(None) => {}
                Err(e) => warn!("[Store] 远程按主键查询 {} 失败，回退到内存数据: {:#}", T::TABLE, e),
            }
        }
        self.local.find_by_pk(id).await
    }

    pub async fn count<T: Entity>(&self, query: &Query) -> Result<u64> {
        if let Some(remote) = &self.remote {
            match remote.count::<T>(query).await {
                Ok(n) => return Ok(n),
                Err(e) => warn!("[Store] 远程计数 {} 失败，回退到内存数据: {:#}", T::TABLE, e),
            }
        }
        self.local.count::<T>(query).await
    }

    pub async fn create<T: Entity>(&self, row: T) -> Result<T> {
        if let Some(remote) = &self.remote {
            match remote.create(&row).await {
                Ok(created) => return Ok(created),
                Err(e) => warn!("[Store] 远程插入 {} 失败，写入内存数据: {:#}", T::TABLE, e),
            }
        }
        self.local.create(row).await
    }

    pub async fn update<T: Entity>(&self, patch: &Value, query: &Query) -> Result<Vec<T>> {
        if let Some(remote) = &self.remote {
            match remote.update::<T>(patch, query).await {
                Ok(rows) => return Ok(rows),
                Err(e) => warn!("[Store] 远程更新 {} 失败，改写内存数据: {:#}", T::TABLE, e),
            }
        }
        self.local.update(patch, query).await
    }

    pub async fn destroy<T: Entity>(&self, query: &Query) -> Result<u64> {
        if let Some(remote) = &self.remote {
            match remote.destroy::<T>(query).await {
                Ok(n) => return Ok(n),
                Err(e) => warn!("[Store] 远程删除 {} 失败，删除内存数据: {:#}", T::TABLE, e),
            }
        }
        self.local.destroy::<T>(query).await
    }

    /// 原子自增：远程走数据库端 RPC，回退路径在写锁内读改写
    pub async fn increment<T: Entity>(&self, id: i64, field: &'static str, by: i64) -> Result<()> {
        if let Some(remote) = &self.remote {
            match remote.increment(T::TABLE, field, id, by).await {
                Ok(()) => return Ok(()),
                Err(e) => warn!("[Store] 远程自增 {}.{} 失败，改写内存数据: {:#}", T::TABLE, field, e),
            }
        }
        self.local.increment::<T>(id, field, by).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Row {
        #[serde(default)]
        id: i64,
        name: String,
    }

    impl Entity for Row {
        const TABLE: &'static str = "rows";
        fn id(&self) -> i64 {
            self.id
        }
        fn set_id(&mut self, id: i64) {
            self.id = id;
        }
    }

    /// 远端指向一个必然拒绝连接的地址，验证所有操作静默落到内存数据集
    fn unreachable_store() -> FallbackStore {
        let remote = SupabaseClient::new("http://127.0.0.1:1", "test-key").expect("构造客户端");
        FallbackStore {
            remote: Some(remote),
            local: MemoryStore::new(),
        }
    }

    #[tokio::test]
    async fn falls_back_to_memory_when_remote_unreachable() -> Result<()> {
        let store = unreachable_store();

        let created = store
            .create(Row {
                id: 0,
                name: "离线写入".into(),
            })
            .await?;
        assert_eq!(created.id, 1);

        let found: Option<Row> = store.find_by_pk(created.id).await?;
        assert_eq!(found.map(|r| r.name), Some("离线写入".to_string()));

        let all: Vec<Row> = store.find_all(&Query::new()).await?;
        assert_eq!(all.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn missing_row_in_both_backends_is_none() -> Result<()> {
        let store = unreachable_store();
        let missing: Option<Row> = store.find_by_pk(42).await?;
        assert!(missing.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn destroy_falls_back_and_reports_count() -> Result<()> {
        let store = unreachable_store();
        store
            .create(Row {
                id: 0,
                name: "待删".into(),
            })
            .await?;
        let removed = store.destroy::<Row>(&Query::new().eq("name", "待删")).await?;
        assert_eq!(removed, 1);
        Ok(())
    }
}
