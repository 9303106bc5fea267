//! # collect 子命令 CLI 定义
//!
//! 并行提取作业根目录下所有作业的结果
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/collect.rs`

use crate::extractor::DEFAULT_MAX_ITERATIONS;
use clap::Args;
use std::path::PathBuf;

/// collect 子命令参数
#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Root directory whose sub-directories are prepared OLCAO jobs
    pub jobs_root: PathBuf,

    /// Name of the retrieved-files directory inside each job
    #[arg(long, default_value = "retrieved")]
    pub retrieved_subdir: String,

    /// Search job directories recursively (for workflow sets)
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// SCF iteration limit used when no convergence marker is printed
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: u32,

    /// Filename for the CSV summary
    #[arg(long, default_value = "olcao_results.csv")]
    pub output: PathBuf,

    /// Number of parallel jobs (0 = all CPUs)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,
}
