//! # 日志初始化
//!
//! 诊断日志统一走 `tracing`，写到 stderr，与 stdout 上的表格/JSON 输出分开。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器，设置时优先于 `-v`
///   例如: RUST_LOG=olcaokit::extractor=trace
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "olcaokit=debug"
    } else {
        "olcaokit=warn"
    }
}
