//! 进程内回退存储
//!
//! 远程行存储不可达时的降级数据集。所有表共用一把 `RwLock`，
//! 并发回退写入串行化执行（原实现的无锁共享数组会交错写入，这里修掉）。
//! 启动时用示例数据预填充，保证离线模式下前端仍有内容可浏览。

use super::{Cond, Entity, Query, SortDir};
use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// 单张表的数据：行数组 + 自增主键计数器
#[derive(Default)]
struct TableData {
    rows: Vec<Value>,
    next_id: i64,
}

/// 内存存储
pub struct MemoryStore {
    tables: RwLock<HashMap<&'static str, TableData>>,
}

impl MemoryStore {
    /// 创建空存储
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// 创建并预填充示例数据（游戏、攻略、标签、演示用户）
    pub fn with_seed_data() -> Self {
        let store = Self::new();
        {
            let mut tables = store.tables.try_write().expect("新建存储不会有并发访问");
            seed(&mut tables);
        }
        store
    }

    /// 查询表中所有满足条件的行
    pub async fn find_all<T: Entity>(&self, query: &Query) -> Result<Vec<T>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Value> = match tables.get(T::TABLE) {
            Some(table) => table
                .rows
                .iter()
                .filter(|row| matches_all(row, &query.conds))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        drop(tables);

        if let Some((field, dir)) = query.order_by {
            rows.sort_by(|a, b| {
                let ord = cmp_field(a, b, field);
                if dir == SortDir::Desc {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        if let Some(offset) = query.offset {
            rows = rows.into_iter().skip(offset).collect();
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        debug!("[MemStore] {} 查询命中 {} 行", T::TABLE, rows.len());
        rows.into_iter()
            .map(|row| serde_json::from_value(row).context("内存行反序列化失败"))
            .collect()
    }

    /// 按主键查询，两边都没有时返回 `None` 而不是错误
    pub async fn find_by_pk<T: Entity>(&self, id: i64) -> Result<Option<T>> {
        let rows: Vec<T> = self
            .find_all(&Query::new().eq("id", id).limit(1))
            .await?;
        Ok(rows.into_iter().next())
    }

    /// 满足条件的行数
    pub async fn count<T: Entity>(&self, query: &Query) -> Result<u64> {
        let tables = self.tables.read().await;
        let n = match tables.get(T::TABLE) {
            Some(table) => table
                .rows
                .iter()
                .filter(|row| matches_all(row, &query.conds))
                .count(),
            None => 0,
        };
        Ok(n as u64)
    }

    /// 插入一行，分配自增主键，调用方字段原样保留
    pub async fn create<T: Entity>(&self, mut row: T) -> Result<T> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(T::TABLE).or_default();
        if table.next_id == 0 {
            table.next_id = 1;
        }
        row.set_id(table.next_id);
        table.next_id += 1;
        table
            .rows
            .push(serde_json::to_value(&row).context("内存行序列化失败")?);
        debug!("[MemStore] {} 插入行 id={}", T::TABLE, row.id());
        Ok(row)
    }

    /// 按条件部分更新，`patch` 中的字段覆盖原值，返回更新后的行
    pub async fn update<T: Entity>(&self, patch: &Value, query: &Query) -> Result<Vec<T>> {
        let patch_obj = patch
            .as_object()
            .context("更新补丁必须是 JSON 对象")?;
        let mut tables = self.tables.write().await;
        let table = tables.entry(T::TABLE).or_default();
        let mut updated = Vec::new();
        for row in table.rows.iter_mut() {
            if matches_all(row, &query.conds) {
                if let Some(obj) = row.as_object_mut() {
                    for (key, value) in patch_obj {
                        obj.insert(key.clone(), value.clone());
                    }
                }
                updated.push(serde_json::from_value(row.clone()).context("内存行反序列化失败")?);
            }
        }
        debug!("[MemStore] {} 更新 {} 行", T::TABLE, updated.len());
        Ok(updated)
    }

    /// 按条件删除，返回删除行数
    pub async fn destroy<T: Entity>(&self, query: &Query) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(T::TABLE).or_default();
        let before = table.rows.len();
        table.rows.retain(|row| !matches_all(row, &query.conds));
        let removed = (before - table.rows.len()) as u64;
        debug!("[MemStore] {} 删除 {} 行", T::TABLE, removed);
        Ok(removed)
    }

    /// 原子自增：持写锁期间读改写，并发调用不会丢失更新
    pub async fn increment<T: Entity>(&self, id: i64, field: &str, by: i64) -> Result<()> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(T::TABLE).or_default();
        for row in table.rows.iter_mut() {
            if row.get("id").and_then(Value::as_i64) == Some(id) {
                let current = row.get(field).and_then(Value::as_i64).unwrap_or(0);
                if let Some(obj) = row.as_object_mut() {
                    obj.insert(field.to_string(), json!(current + by));
                }
                return Ok(());
            }
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// 行是否满足全部条件
fn matches_all(row: &Value, conds: &[Cond]) -> bool {
    conds.iter().all(|cond| matches_one(row, cond))
}

fn matches_one(row: &Value, cond: &Cond) -> bool {
    match cond {
        Cond::Eq(field, expected) => row.get(*field).unwrap_or(&Value::Null) == expected,
        Cond::Contains(field, needle) => row
            .get(*field)
            .and_then(Value::as_str)
            .map(|s| s.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false),
        Cond::Gte(field, bound) => {
            let actual = row.get(*field).unwrap_or(&Value::Null);
            cmp_values(actual, bound) != Ordering::Less
        }
        Cond::Or(conds) => conds.iter().any(|c| matches_one(row, c)),
    }
}

fn cmp_field(a: &Value, b: &Value, field: &str) -> Ordering {
    cmp_values(
        a.get(field).unwrap_or(&Value::Null),
        b.get(field).unwrap_or(&Value::Null),
    )
}

/// JSON 值的全序比较：数值按大小，字符串按字典序，其余视为相等
fn cmp_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// 示例数据，与线上环境首次初始化时写入的内容一致
fn seed(tables: &mut HashMap<&'static str, TableData>) {
    let now = chrono::Utc::now();

    let games = vec![
        json!({
            "id": 1, "name": "原神",
            "description": "开放世界冒险游戏，拥有精美的画面和丰富的剧情。",
            "developer": "米哈游", "category": "RPG",
            "release_date": "2020-09-28",
            "cover_image_url": "https://example.com/genshin.jpg",
            "status": "active", "created_at": now, "updated_at": now
        }),
        json!({
            "id": 2, "name": "王者荣耀",
            "description": "多人在线战术竞技游戏，5v5对战玩法。",
            "developer": "腾讯游戏", "category": "MOBA",
            "release_date": "2015-11-26",
            "cover_image_url": "https://example.com/honor-of-kings.jpg",
            "status": "active", "created_at": now, "updated_at": now
        }),
        json!({
            "id": 3, "name": "绝地求生",
            "description": "大逃杀类型游戏，100名玩家在一个岛上生存竞技。",
            "developer": "PUBG Corporation", "category": "射击",
            "release_date": "2017-12-20",
            "cover_image_url": "https://example.com/pubg.jpg",
            "status": "active", "created_at": now, "updated_at": now
        }),
    ];

    let strategies = vec![
        json!({
            "id": 1, "game_id": 1, "user_id": 1,
            "title": "原神新手入门指南",
            "content": "欢迎来到提瓦特大陆！作为新手，建议先完成主线任务，熟悉游戏机制，再逐步探索地图收集资源。",
            "difficulty": "beginner", "type": "guide",
            "status": "published", "view_count": 1532,
            "created_at": now, "updated_at": now
        }),
        json!({
            "id": 2, "game_id": 1, "user_id": 2,
            "title": "原神角色培养攻略",
            "content": "角色培养是提升战斗力的关键，本攻略详细介绍各角色的培养路线、天赋优先级与圣遗物搭配思路。",
            "difficulty": "intermediate", "type": "build",
            "status": "published", "view_count": 2845,
            "created_at": now, "updated_at": now
        }),
        json!({
            "id": 3, "game_id": 2, "user_id": 1,
            "title": "王者荣耀打野技巧大全",
            "content": "打野是游戏中的重要位置，本攻略将教你如何高效清野和Gank，掌握野区节奏带动全场胜利。",
            "difficulty": "intermediate", "type": "strategy",
            "status": "published", "view_count": 3210,
            "created_at": now, "updated_at": now
        }),
        json!({
            "id": 4, "game_id": 3, "user_id": 2,
            "title": "绝地求生枪法提升指南",
            "content": "枪法是绝地求生中的核心技能，本攻略包含大量实战技巧和训练方法，帮助你稳定压枪精准点射。",
            "difficulty": "advanced", "type": "guide",
            "status": "published", "view_count": 4567,
            "created_at": now, "updated_at": now
        }),
    ];

    let tags = vec![
        json!({"id": 1, "name": "新手向", "color": "#4caf50"}),
        json!({"id": 2, "name": "进阶", "color": "#ff9800"}),
        json!({"id": 3, "name": "速通", "color": "#2196f3"}),
        json!({"id": 4, "name": "装备", "color": "#9c27b0"}),
    ];

    // 演示账号，密码均为 123456
    let demo_hash = bcrypt::hash("123456", bcrypt::DEFAULT_COST)
        .unwrap_or_else(|_| String::new());
    let users = vec![
        json!({
            "id": 1, "username": "游戏大师", "password": demo_hash,
            "email": "master@example.com", "online_status": "online",
            "last_active": now, "created_at": now, "updated_at": now
        }),
        json!({
            "id": 2, "username": "吃鸡达人", "password": demo_hash,
            "email": "chicken@example.com", "online_status": "offline",
            "last_active": now, "created_at": now, "updated_at": now
        }),
    ];

    let channels = vec![
        json!({
            "id": 1, "name": "综合讨论",
            "description": "讨论各种游戏相关话题",
            "created_by": 1, "created_at": now, "updated_at": now
        }),
        json!({
            "id": 2, "name": "求助问答",
            "description": "遇到游戏问题？在这里提问",
            "created_by": 1, "created_at": now, "updated_at": now
        }),
        json!({
            "id": 3, "name": "攻略分享",
            "description": "分享你的游戏攻略和技巧",
            "created_by": 1, "created_at": now, "updated_at": now
        }),
    ];

    insert_table(tables, "games", games);
    insert_table(tables, "strategies", strategies);
    insert_table(tables, "tags", tags);
    insert_table(tables, "users", users);
    insert_table(tables, "community_channels", channels);
}

fn insert_table(tables: &mut HashMap<&'static str, TableData>, name: &'static str, rows: Vec<Value>) {
    let next_id = rows
        .iter()
        .filter_map(|r| r.get("id").and_then(Value::as_i64))
        .max()
        .unwrap_or(0)
        + 1;
    tables.insert(name, TableData { rows, next_id });
}
