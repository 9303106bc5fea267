//! # olcaokit 命令行入口
//!
//! ## 子命令
//! - `plan`     - 打印作业计划
//! - `prepare`  - 生成作业目录（骨架、plan.json、sbatch 脚本）
//! - `extract`  - 解析一个取回目录
//! - `collect`  - 并行解析多个作业
//! - `plot-dos` - 绘制总态密度

use clap::Parser;
use olcaokit::cli::Cli;
use olcaokit::{commands, logging, utils};

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();
    logging::init(cli.verbose);

    match commands::run(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            utils::output::print_error(&format!("{}", e));
            std::process::exit(1);
        }
    }
}
