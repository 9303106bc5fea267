//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑，返回进程退出码。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `planner/`, `extractor/`, `parsers/`, `utils/`
//! - 子模块: plan, prepare, extract, collect, plot_dos

pub mod collect;
pub mod extract;
pub mod plan;
pub mod plot_dos;
pub mod prepare;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令，返回进程退出码
pub fn run(cmd: Commands) -> Result<i32> {
    match cmd {
        Commands::Plan(args) => plan::execute(args),
        Commands::Prepare(args) => prepare::execute(args),
        Commands::Extract(args) => extract::execute(args),
        Commands::Collect(args) => collect::execute(args),
        Commands::PlotDos(args) => plot_dos::execute(args),
    }
}
