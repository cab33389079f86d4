//! 媒体文件管道：落盘上传 + 静态回源

pub mod serve;
pub mod upload;

pub use serve::serve_upload;
pub use upload::{ensure_dirs, MediaKind, SavedFile};
