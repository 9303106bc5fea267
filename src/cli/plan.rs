//! # plan 子命令 CLI 定义
//!
//! 根据参数和骨架文件打印作业计划
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/plan.rs`

use super::common::ParamArgs;
use clap::Args;
use std::path::PathBuf;

/// plan 子命令参数
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the OLCAO skeleton (.skl) file
    pub skeleton: PathBuf,

    #[command(flatten)]
    pub params: ParamArgs,

    /// Also retrieve the (large) wave-function checkpoint files
    #[arg(long, default_value_t = false)]
    pub checkpoints: bool,

    /// Print the plan as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
