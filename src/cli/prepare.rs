//! # prepare 子命令 CLI 定义
//!
//! 生成 OLCAO 作业目录（骨架、计划、sbatch 脚本），不提交
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/prepare.rs`

use super::common::{OlcaoEnvArgs, ParamArgs, SlurmArgs};
use clap::Args;
use std::path::PathBuf;

/// prepare 子命令参数
#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Path to the OLCAO skeleton (.skl) file
    pub skeleton: PathBuf,

    /// Job directory to create
    #[arg(long, short = 'o')]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub params: ParamArgs,

    /// Prepare an SCF job plus these post-SCF jobs (comma-separated, e.g. 'dos,bond')
    #[arg(long, value_delimiter = ',')]
    pub calculations: Option<Vec<String>>,

    /// Also retrieve the (large) wave-function checkpoint files
    #[arg(long, default_value_t = false)]
    pub checkpoints: bool,

    /// Overwrite files in an existing job directory
    #[arg(long, default_value_t = false)]
    pub force: bool,

    #[command(flatten)]
    pub env: OlcaoEnvArgs,

    #[command(flatten)]
    pub slurm: SlurmArgs,
}
