//! 数据访问层：远程优先、本地回退的双后端存储
//!
//! 每个实体对应远程行存储中的一张表和本地内存存储中的一个数组。
//! 上层（路由/服务）只依赖 [`FallbackStore`]，不感知请求实际由哪个后端提供。

pub mod fallback;
pub mod memory;
pub mod remote;

pub use fallback::FallbackStore;
pub use memory::MemoryStore;
pub use remote::SupabaseClient;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// 为模型类型实现 [`Entity`]：绑定表名，主键统一叫 `id`
#[macro_export]
macro_rules! impl_entity {
    ($ty:ty, $table:literal) => {
        impl $crate::hub::store::Entity for $ty {
            const TABLE: &'static str = $table;

            fn id(&self) -> i64 {
                self.id
            }

            fn set_id(&mut self, id: i64) {
                self.id = id;
            }
        }
    };
}

/// 可持久化实体
///
/// 约定：实体以 `i64` 自增主键 `id` 标识，序列化后的字段名与表列名一致。
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// 表名（远程为 Supabase 表名，本地为集合键）
    const TABLE: &'static str;

    fn id(&self) -> i64;

    fn set_id(&mut self, id: i64);
}

/// 单个查询条件
///
/// 过滤语言是封闭的：只有等值、子串（ilike）、大于等于和一层 OR 块，
/// 这是两个后端都能翻译的交集。表达不了的条件在类型上就不存在，
/// 调用方必须围绕这四种形态设计查询（其余筛选在应用层完成）。
#[derive(Debug, Clone)]
pub enum Cond {
    /// 字段等值匹配
    Eq(&'static str, Value),
    /// 子串匹配，忽略大小写（远程翻译为 `ilike.*x*`）
    Contains(&'static str, String),
    /// 大于等于比较
    Gte(&'static str, Value),
    /// 一层 OR 块，成员不允许再嵌套 OR
    Or(Vec<Cond>),
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

/// 查询选项，对应原数据层的 `findAll(options)`
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub conds: Vec<Cond>,
    pub order_by: Option<(&'static str, SortDir)>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.conds.push(Cond::Eq(field, value.into()));
        self
    }

    pub fn contains(mut self, field: &'static str, needle: impl Into<String>) -> Self {
        self.conds.push(Cond::Contains(field, needle.into()));
        self
    }

    pub fn gte(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.conds.push(Cond::Gte(field, value.into()));
        self
    }

    pub fn or(mut self, conds: Vec<Cond>) -> Self {
        self.conds.push(Cond::Or(conds));
        self
    }

    pub fn order_asc(mut self, field: &'static str) -> Self {
        self.order_by = Some((field, SortDir::Asc));
        self
    }

    pub fn order_desc(mut self, field: &'static str) -> Self {
        self.order_by = Some((field, SortDir::Desc));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: usize) -> Self {
        self.offset = Some(n);
        self
    }
}
