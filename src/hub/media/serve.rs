//! 上传文件的静态回源
//!
//! 先做 URL 解码后的精确路径匹配；落空时只保留一条迁移期兜底逻辑：
//! 扫描目录，命中"再做一次百分号解码后同名"或"扩展名相同且 UUID 后缀
//! 相同"的条目。这是给旧数据（编码错位时期写入的文件）留的桥，新写入
//! 的文件名在落盘时已经 UTF-8 对齐，正常都走精确匹配。

use crate::hub::error::{AppError, AppResult};
use crate::hub::state::AppState;
use axum::body::Body;
use axum::extract::{Path as UrlPath, State};
use axum::http::header;
use axum::response::Response;
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

/// `GET /uploads/:kind/:name`
pub async fn serve_upload(
    State(state): State<AppState>,
    UrlPath((kind, name)): UrlPath<(String, String)>,
) -> AppResult<Response> {
    if kind != "images" && kind != "videos" {
        return Err(AppError::NotFound("文件不存在".to_string()));
    }

    // 穿越检查必须在百分号解码之后：`%2E%2E%2F` 原文不含 `..`，
    // 解码后才现形。解码后必须是纯文件名，带任何路径成分都拒绝。
    let decoded = percent_decode_str(&name).decode_utf8_lossy().to_string();
    if !is_plain_basename(&decoded) {
        return Err(AppError::Validation("非法的文件名".to_string()));
    }

    let dir = state.config.upload_dir.join(&kind);

    // 精确匹配
    let exact = dir.join(&decoded);
    if tokio::fs::try_exists(&exact).await.unwrap_or(false) {
        return read_file(&exact).await;
    }

    // 迁移期兜底：目录扫描
    if let Some(matched) = repair_lookup(&dir, &decoded).await {
        info!("[Uploads] 编码兜底命中: {} -> {}", decoded, matched.display());
        return read_file(&matched).await;
    }

    debug!("[Uploads] 未找到文件: {}/{}", kind, decoded);
    Err(AppError::NotFound("文件不存在".to_string()))
}

/// 目录扫描匹配：二次百分号解码同名，或扩展名相同且 UUID 后缀相同
async fn repair_lookup(dir: &Path, requested: &str) -> Option<PathBuf> {
    let double_decoded = percent_decode_str(requested).decode_utf8_lossy().to_string();
    let requested_uuid = extract_uuid(requested);
    let requested_ext = super::upload::extension_of(requested);

    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let entry_name = entry.file_name().to_string_lossy().to_string();
        if double_decoded != *requested && entry_name == double_decoded {
            return Some(entry.path());
        }
        if let (Some(want), Some(have)) = (requested_uuid.as_deref(), extract_uuid(&entry_name)) {
            if want == have && super::upload::extension_of(&entry_name) == requested_ext {
                return Some(entry.path());
            }
        }
    }
    None
}

/// 解码后的请求名必须是单个文件名，不能携带任何路径成分
fn is_plain_basename(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
        && !name.contains('\0')
}

/// 流式回源：视频可达 50MB，不整块读进内存
async fn read_file(path: &Path) -> AppResult<Response> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::from(e).context("打开上传文件失败")))?;
    let len = file.metadata().await.ok().map(|m| m.len());

    let mut builder = Response::builder().header(header::CONTENT_TYPE, content_type_of(path));
    if let Some(len) = len {
        builder = builder.header(header::CONTENT_LENGTH, len);
    }
    builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Internal(anyhow::Error::from(e).context("构造文件响应失败")))
}

fn content_type_of(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("mp4") => "video/mp4",
        Some("avi") => "video/avi",
        Some("mov") => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// 从文件名里抠出 UUID v4 子串（8-4-4-4-12 的十六进制段）
pub fn extract_uuid(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    if bytes.len() < 36 {
        return None;
    }
    for start in 0..=(bytes.len() - 36) {
        let window = &bytes[start..start + 36];
        if is_uuid(window) {
            // 窗口是纯 ASCII，回转字符串安全
            return std::str::from_utf8(window).ok().map(|s| s.to_lowercase());
        }
    }
    None
}

fn is_uuid(window: &[u8]) -> bool {
    window.iter().enumerate().all(|(i, &b)| match i {
        8 | 13 | 18 | 23 => b == b'-',
        _ => b.is_ascii_hexdigit(),
    })
}
