//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `plan`: 打印作业计划
//! - `prepare`: 生成作业目录
//! - `extract`: 解析一个取回目录
//! - `collect`: 并行解析多个作业
//! - `plot-dos`: 绘制总态密度
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: common, plan, prepare, extract, collect, plot_dos

pub mod collect;
pub mod common;
pub mod extract;
pub mod plan;
pub mod plot_dos;
pub mod prepare;

use clap::{Parser, Subcommand};

/// olcaokit - OLCAO 作业规划与结果提取工具
#[derive(Parser)]
#[command(name = "olcaokit")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Plan OLCAO (makeinput + uolcao) jobs and extract their results", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Print debug diagnostics (RUST_LOG overrides)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Show the makeinput/uolcao invocation and expected outputs for a job
    Plan(plan::PlanArgs),

    /// Create a job directory with the staged skeleton, plan.json and a Slurm script
    Prepare(prepare::PrepareArgs),

    /// Extract the result of one retrieved job directory
    Extract(extract::ExtractArgs),

    /// Extract all jobs under a root directory in parallel
    Collect(collect::CollectArgs),

    /// Plot the total density of states
    PlotDos(plot_dos::PlotDosArgs),
}
