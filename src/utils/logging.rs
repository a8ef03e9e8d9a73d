//! 日志工具模块
//!
//! 提供日志初始化和输出的辅助函数

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::models::SessionState;

/// 初始化日志：同时输出到终端和日志文件
///
/// `RUST_LOG` 优先；否则默认 `info`，`verbose` 时为 `debug`。
pub fn init(log_file_path: &str, verbose: bool) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path))?;
    file.write_all(log_header().as_bytes())
        .with_context(|| format!("无法写入日志文件: {}", log_file_path))?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("日志系统已经初始化")?;
    Ok(())
}

/// 只输出到终端（status / logs / config 等短命令）
pub fn init_console() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn log_header() -> String {
    format!(
        "{}\n自动解题日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    )
}

/// 记录程序启动信息
pub fn log_startup(config: &Config, session: &SessionState) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 自动解题模式");
    info!("🌐 站点: {}", config.site_origin);
    info!("💾 状态文件: {}", config.store_path);
    info!(
        "📊 今日进度: {} (状态: {}，自动运行: {})",
        session.progress(),
        session.loop_state(),
        if session.auto_run { "开" } else { "关" }
    );
    info!("{}", "=".repeat(60));
}

/// 记录程序退出信息
pub fn log_shutdown(session: &SessionState, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!(
        "🏁 程序退出 - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("📊 今日进度: {} ({})", session.progress(), session.loop_state());
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
