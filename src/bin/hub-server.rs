//! 游戏攻略分享平台服务端入口
//!
//! 配置全部来自环境变量（SECRET_KEY 必填），命令行参数只做覆盖。

use anyhow::{Context, Result};
use clap::Parser;
use strategy_hub::hub::admin::service::spawn_session_sweeper;
use strategy_hub::hub::media::ensure_dirs;
use strategy_hub::{serve, AppState, Config};
use tracing::info;

/// 游戏攻略分享平台服务端
#[derive(Parser, Debug)]
#[command(name = "hub-server")]
#[command(about = "游戏攻略分享平台后端服务", long_about = None)]
struct Args {
    /// 监听端口（覆盖环境变量 PORT）
    #[arg(short, long)]
    port: Option<u16>,

    /// 上传目录（覆盖环境变量 UPLOAD_DIR）
    #[arg(long)]
    upload_dir: Option<std::path::PathBuf>,

    /// 日志级别（默认: info,strategy_hub=debug）
    #[arg(long, default_value = "info,strategy_hub=debug")]
    log_level: String,
}

/// 初始化日志（同时输出到 stdout 和文件）
fn init_logger(log_level: &str) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // 日志文件（追加模式）
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("server.log")
        .context("无法创建日志文件 server.log")?;

    // 控制台保留 ANSI 颜色，文件禁用
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    info!("[Server] 📝 日志已同时输出到控制台和文件: server.log");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level)?;

    let mut config = Config::from_env()?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(upload_dir) = args.upload_dir {
        config.upload_dir = upload_dir;
    }

    ensure_dirs(&config.upload_dir)?;
    info!("[Server] 上传目录: {}", config.upload_dir.display());

    let state = AppState::new(config)?;
    spawn_session_sweeper(state.store.clone());

    serve(state).await
}
