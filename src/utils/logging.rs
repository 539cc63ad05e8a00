/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{info, Subscriber};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// 初始化 tracing 日志：同时输出到终端和运行日志文件
///
/// `RUST_LOG` 优先；否则默认 `info`，开启详细日志时为 `debug`
pub fn init(verbose: bool, log_file_path: &str) -> Result<()> {
    let log_file = init_log_file(log_file_path)?;
    let _ = tracing::subscriber::set_global_default(build_subscriber(verbose, log_file));
    Ok(())
}

/// 构建订阅器：终端一层，日志文件一层（无颜色）
pub fn build_subscriber(verbose: bool, log_file: File) -> impl Subscriber + Send + Sync + 'static {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
}

/// 初始化日志文件：清空并写入表头
///
/// # 参数
/// - `log_file_path`: 日志文件路径
///
/// # 返回
/// 已写入表头的文件句柄，后续日志追加在表头之后
pub fn init_log_file(log_file_path: &str) -> Result<File> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_file_path)
        .with_context(|| format!("无法创建日志文件: {}", log_file_path))?;

    writeln!(
        file,
        "{}\n测验生成日志 - {}\n{}\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    )?;
    Ok(file)
}

/// 记录程序启动信息
pub fn log_startup(source: &str, batch_size: usize, retention_limit: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 简报测验生成");
    info!("📂 来源: {}", source);
    info!("📊 每次最多处理 {} 篇，索引保留 {} 条", batch_size, retention_limit);
    info!("{}", "=".repeat(60));
}

/// 记录文档加载信息
pub fn log_documents_loaded(total: usize, already_processed: usize) {
    info!("✓ 找到 {} 篇候选文档", total);
    info!("📋 其中 {} 篇已处理过，将跳过", already_processed);
}

/// 打印最终统计信息
pub fn print_final_stats(
    published: usize,
    skipped: usize,
    failed: usize,
    total: usize,
    log_file_path: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已发布: {}/{}", published, total);
    info!("⏭️ 跳过: {}", skipped);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}
