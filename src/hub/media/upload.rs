//! 上传文件落盘
//!
//! 命名规则：`<原始主名>-<uuid-v4><扩展名>`，UUID 后缀保证同名文件不覆盖。
//! 文件名在写入时就固定为 UTF-8（存进媒体行的名字与磁盘上的字节一致），
//! 老版本"落盘是 Latin-1 误解码、库里是 UTF-8"的错位从源头消除。

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// 单文件上限 50MB
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;
/// 单次请求文件总数上限
pub const MAX_FILES_PER_REQUEST: usize = 10;
/// 图片最多 5 个
pub const MAX_IMAGES: usize = 5;
/// 视频最多 1 个
pub const MAX_VIDEOS: usize = 1;

const ALLOWED_IMAGE_MIME: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];
const ALLOWED_IMAGE_EXT: [&str; 4] = ["jpg", "jpeg", "png", "gif"];
const ALLOWED_VIDEO_MIME: [&str; 3] = ["video/mp4", "video/avi", "video/quicktime"];
const ALLOWED_VIDEO_EXT: [&str; 3] = ["mp4", "avi", "mov"];

/// 媒体种类，决定子目录与准入名单
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// 存储子目录名
    pub fn dir(self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
        }
    }

    /// multipart 字段名 → 媒体种类
    pub fn from_field(field_name: &str) -> Option<Self> {
        match field_name {
            "images" => Some(MediaKind::Image),
            "videos" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// 一个已落盘的上传文件
#[derive(Debug, Clone)]
pub struct SavedFile {
    pub kind: MediaKind,
    /// 磁盘绝对路径
    pub disk_path: PathBuf,
    /// 对外 URL 路径，如 `/uploads/images/xxx.png`
    pub url_path: String,
    /// 落盘文件名（带 UUID 后缀）
    pub file_name: String,
    pub original_name: String,
    pub size: i64,
    pub mime_type: String,
}

/// 创建 `uploads/images` 与 `uploads/videos`
pub fn ensure_dirs(upload_dir: &Path) -> Result<()> {
    for kind in [MediaKind::Image, MediaKind::Video] {
        let dir = upload_dir.join(kind.dir());
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("创建上传目录失败: {}", dir.display()))?;
    }
    Ok(())
}

/// 准入检查：先看声明的 MIME，再看扩展名，两关都过才收
pub fn admit(kind: MediaKind, original_name: &str, content_type: &str) -> Result<(), String> {
    let (mimes, exts, reject_msg): (&[&str], &[&str], &str) = match kind {
        MediaKind::Image => (
            &ALLOWED_IMAGE_MIME,
            &ALLOWED_IMAGE_EXT,
            "只支持JPG、PNG和GIF格式的图片",
        ),
        MediaKind::Video => (
            &ALLOWED_VIDEO_MIME,
            &ALLOWED_VIDEO_EXT,
            "只支持MP4、AVI和MOV格式的视频",
        ),
    };
    if !mimes.contains(&content_type) {
        return Err(reject_msg.to_string());
    }
    let ext = extension_of(original_name);
    if !exts.contains(&ext.as_str()) {
        return Err(reject_msg.to_string());
    }
    Ok(())
}

/// 生成落盘文件名：原始主名（清洗后）+ UUID v4 + 原扩展名
pub fn unique_name(original_name: &str) -> String {
    let base = sanitize_base_name(original_name);
    let ext = extension_of(original_name);
    if ext.is_empty() {
        format!("{}-{}", base, Uuid::new_v4())
    } else {
        format!("{}-{}.{}", base, Uuid::new_v4(), ext)
    }
}

/// 落盘并返回文件记录；大小超限在写入前拒绝
pub async fn save(
    upload_dir: &Path,
    kind: MediaKind,
    original_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Result<SavedFile> {
    admit(kind, original_name, content_type).map_err(|msg| anyhow::anyhow!(msg))?;
    if bytes.len() > MAX_FILE_SIZE {
        anyhow::bail!("文件超过大小限制（50MB）: {}", original_name);
    }

    let file_name = unique_name(original_name);
    let disk_path = upload_dir.join(kind.dir()).join(&file_name);
    tokio::fs::write(&disk_path, bytes)
        .await
        .with_context(|| format!("写入上传文件失败: {}", disk_path.display()))?;

    info!(
        "[Upload] 保存{}: {} ({} 字节)",
        if kind == MediaKind::Image { "图片" } else { "视频" },
        file_name,
        bytes.len()
    );
    Ok(SavedFile {
        kind,
        url_path: format!("/uploads/{}/{}", kind.dir(), file_name),
        disk_path,
        file_name,
        original_name: original_name.to_string(),
        size: bytes.len() as i64,
        mime_type: content_type.to_string(),
    })
}

/// 回滚清理：删掉本次请求已写入的文件，文件不在不算错
pub async fn cleanup(files: &[SavedFile]) {
    for file in files {
        match tokio::fs::remove_file(&file.disk_path).await {
            Ok(()) => info!("[Upload] 回滚删除: {}", file.disk_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("[Upload] 回滚删除失败 {}: {}", file.disk_path.display(), e),
        }
    }
}

/// 小写扩展名（不带点）
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// 原始文件名的主名部分，去掉目录分隔符等危险字符，UTF-8 原样保留
fn sanitize_base_name(original_name: &str) -> String {
    let base = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    let cleaned: String = base
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_allowed_image_types() {
        assert!(admit(MediaKind::Image, "截图.png", "image/png").is_ok());
        assert!(admit(MediaKind::Image, "photo.JPG", "image/jpeg").is_ok());
        assert!(admit(MediaKind::Video, "实况.mp4", "video/mp4").is_ok());
        assert!(admit(MediaKind::Video, "clip.mov", "video/quicktime").is_ok());
    }

    #[test]
    fn rejects_disallowed_mime_or_extension() {
        // MIME 对但扩展名不对
        assert!(admit(MediaKind::Image, "evil.exe", "image/png").is_err());
        // 扩展名对但 MIME 不对
        assert!(admit(MediaKind::Image, "pic.png", "application/octet-stream").is_err());
        // 图片名单不收视频
        assert!(admit(MediaKind::Image, "movie.mp4", "video/mp4").is_err());
    }

    #[test]
    fn unique_name_keeps_base_and_extension() {
        let a = unique_name("原神攻略图.png");
        let b = unique_name("原神攻略图.png");
        assert!(a.starts_with("原神攻略图-"));
        assert!(a.ends_with(".png"));
        // UUID 后缀保证两次命名不同
        assert_ne!(a, b);
    }

    #[test]
    fn sanitize_strips_path_separators() {
        let name = unique_name("../../etc/passwd.png");
        assert!(!name.contains('/'));
        assert!(!name.contains(".."));
    }

    #[tokio::test]
    async fn oversized_file_rejected_before_write() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("hub-upload-{}", Uuid::new_v4()));
        ensure_dirs(&dir)?;
        let big = vec![0u8; MAX_FILE_SIZE + 1];
        let result = save(&dir, MediaKind::Image, "big.png", "image/png", &big).await;
        assert!(result.is_err());
        // 目录里不能留下半截文件
        let entries: Vec<_> = std::fs::read_dir(dir.join("images"))?.collect();
        assert!(entries.is_empty());
        tokio::fs::remove_dir_all(&dir).await.ok();
        Ok(())
    }

    #[tokio::test]
    async fn save_then_cleanup_leaves_no_file() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("hub-upload-{}", Uuid::new_v4()));
        ensure_dirs(&dir)?;
        let saved = save(&dir, MediaKind::Image, "测试.png", "image/png", b"png-bytes").await?;
        assert!(saved.disk_path.exists());
        cleanup(&[saved.clone()]).await;
        assert!(!saved.disk_path.exists());
        // 重复清理不报错
        cleanup(&[saved]).await;
        tokio::fs::remove_dir_all(&dir).await.ok();
        Ok(())
    }
}
