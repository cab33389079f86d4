//! Supabase（PostgREST）HTTP 客户端
//!
//! 负责所有远程行存储操作。查询条件翻译为 PostgREST 查询参数，
//! 写操作带 `Prefer: return=representation` 以拿回落库后的行。
//! 原子自增走 `/rest/v1/rpc/increment_counter`（函数定义见 sql/increment_counter.sql）。

use super::{Cond, Entity, Query, SortDir};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use tracing::{debug, error};

/// Supabase REST 客户端
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
}

impl SupabaseClient {
    /// 创建客户端，`apikey` 与 `Authorization` 头由默认请求头统一携带
    pub fn new(base_url: impl Into<String>, anon_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(anon_key).context("SUPABASE_ANON_KEY 含非法字符")?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {anon_key}"))
                .context("SUPABASE_ANON_KEY 含非法字符")?,
        );

        let client = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("创建 HTTP 客户端失败")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// 查询表中所有满足条件的行
    pub async fn find_all<T: Entity>(&self, query: &Query) -> Result<Vec<T>> {
        let url = self.table_url(T::TABLE);
        let params = translate_query(query);
        debug!("[Supabase] GET {} 参数: {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .context("请求 Supabase 失败")?;
        let rows: Vec<T> = read_json(response).await?;
        debug!("[Supabase] {} 查询返回 {} 行", T::TABLE, rows.len());
        Ok(rows)
    }

    /// 按主键查询
    pub async fn find_by_pk<T: Entity>(&self, id: i64) -> Result<Option<T>> {
        let rows: Vec<T> = self
            .find_all(&Query::new().eq("id", id).limit(1))
            .await?;
        Ok(rows.into_iter().next())
    }

    /// 满足条件的行数（`Prefer: count=exact`，从 Content-Range 头解析）
    pub async fn count<T: Entity>(&self, query: &Query) -> Result<u64> {
        let url = self.table_url(T::TABLE);
        let mut params = translate_query(query);
        params.push(("select".to_string(), "id".to_string()));
        params.push(("limit".to_string(), "1".to_string()));

        let response = self
            .client
            .get(&url)
            .query(&params)
            .header("Prefer", "count=exact")
            .send()
            .await
            .context("请求 Supabase 失败")?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Supabase 计数失败，HTTP 状态: {status}");
        }

        // Content-Range 形如 "0-0/57"
        let total = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit('/').next())
            .and_then(|v| v.parse::<u64>().ok())
            .context("Content-Range 头缺失或格式非法")?;
        Ok(total)
    }

    /// 插入一行，调用方字段原样透传，返回落库后的行（含分配的主键）
    pub async fn create<T: Entity>(&self, row: &T) -> Result<T> {
        let url = self.table_url(T::TABLE);
        let mut body = serde_json::to_value(row).context("实体序列化失败")?;
        // 主键由远端序列分配
        if let Some(obj) = body.as_object_mut() {
            obj.remove("id");
        }
        debug!("[Supabase] POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .context("请求 Supabase 失败")?;
        let mut rows: Vec<T> = read_json(response).await?;
        rows.pop().context("插入后远端未返回行")
    }

    /// 按条件部分更新，返回更新后的行
    pub async fn update<T: Entity>(&self, patch: &Value, query: &Query) -> Result<Vec<T>> {
        let url = self.table_url(T::TABLE);
        let params = translate_query(query);
        debug!("[Supabase] PATCH {} 参数: {:?}", url, params);

        let response = self
            .client
            .patch(&url)
            .query(&params)
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await
            .context("请求 Supabase 失败")?;
        read_json(response).await
    }

    /// 按条件删除，返回删除行数
    pub async fn destroy<T: Entity>(&self, query: &Query) -> Result<u64> {
        let url = self.table_url(T::TABLE);
        let params = translate_query(query);
        debug!("[Supabase] DELETE {} 参数: {:?}", url, params);

        let response = self
            .client
            .delete(&url)
            .query(&params)
            .header("Prefer", "return=representation")
            .send()
            .await
            .context("请求 Supabase 失败")?;
        let rows: Vec<Value> = read_json(response).await?;
        Ok(rows.len() as u64)
    }

    /// 服务端原子自增（`UPDATE ... SET <col> = <col> + by`）
    pub async fn increment(&self, table: &str, column: &str, id: i64, by: i64) -> Result<()> {
        let url = format!("{}/rest/v1/rpc/increment_counter", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "p_table": table,
                "p_column": column,
                "p_id": id,
                "p_by": by,
            }))
            .send()
            .await
            .context("请求 Supabase 失败")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                "[Supabase] 自增 {}.{} 失败，HTTP 状态: {}, 响应: {}",
                table, column, status, body
            );
            anyhow::bail!("Supabase 自增失败，HTTP 状态: {status}");
        }
        Ok(())
    }
}

/// 读取响应体并反序列化，失败时把原始响应记进日志
async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await.context("读取响应 body 失败")?;
    if !status.is_success() {
        let text = String::from_utf8_lossy(&body);
        error!("[Supabase] 请求失败，HTTP 状态: {}, 响应: {}", status, text);
        anyhow::bail!("Supabase 请求失败，HTTP 状态: {status}");
    }
    serde_json::from_slice(&body).map_err(|e| {
        error!(
            "[Supabase] 响应反序列化失败: {:?}\n原始响应: {}",
            e,
            String::from_utf8_lossy(&body)
        );
        anyhow::anyhow!("反序列化 Supabase 响应失败: {e:?}")
    })
}

/// 把封闭的查询条件翻译成 PostgREST 查询参数
fn translate_query(query: &Query) -> Vec<(String, String)> {
    let mut params = Vec::new();
    for cond in &query.conds {
        match cond {
            Cond::Eq(field, value) => {
                params.push((field.to_string(), format!("eq.{}", literal(value))));
            }
            Cond::Contains(field, needle) => {
                params.push((field.to_string(), format!("ilike.*{needle}*")));
            }
            Cond::Gte(field, value) => {
                params.push((field.to_string(), format!("gte.{}", literal(value))));
            }
            Cond::Or(conds) => {
                let parts: Vec<String> = conds
                    .iter()
                    .filter_map(|c| match c {
                        Cond::Eq(field, value) => {
                            Some(format!("{}.eq.{}", field, literal(value)))
                        }
                        Cond::Contains(field, needle) => {
                            Some(format!("{field}.ilike.*{needle}*"))
                        }
                        Cond::Gte(field, value) => {
                            Some(format!("{}.gte.{}", field, literal(value)))
                        }
                        // OR 块不允许嵌套，翻译时丢弃
                        Cond::Or(_) => None,
                    })
                    .collect();
                params.push(("or".to_string(), format!("({})", parts.join(","))));
            }
        }
    }
    if let Some((field, dir)) = query.order_by {
        let dir = if dir == SortDir::Desc { "desc" } else { "asc" };
        params.push(("order".to_string(), format!("{field}.{dir}")));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(offset) = query.offset {
        params.push(("offset".to_string(), offset.to_string()));
    }
    params
}

/// PostgREST 过滤值字面量：字符串裸写（reqwest 负责 URL 编码），其余走 JSON 文本
fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
