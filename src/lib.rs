pub mod hub;

// 重新导出常用类型，方便二进制与外部使用
pub use hub::{
    config::Config,
    error::{AppError, AppResult},
    server::{build_router, serve},
    state::AppState,
    store::FallbackStore,
};
