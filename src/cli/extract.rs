//! # extract 子命令 CLI 定义
//!
//! 解析一个取回目录，进程退出码即结果退出码
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/extract.rs`

use crate::extractor::DEFAULT_MAX_ITERATIONS;
use clap::Args;
use std::path::PathBuf;

/// extract 子命令参数
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Directory holding the retrieved output files
    pub retrieved: PathBuf,

    /// plan.json written by 'prepare' (default: looked up next to and inside the retrieved directory)
    #[arg(long)]
    pub plan: Option<PathBuf>,

    /// SCF iteration limit used when no convergence marker is printed
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: u32,

    /// Print the result record as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
