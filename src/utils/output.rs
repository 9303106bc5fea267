//! # 美化输出工具
//!
//! 提供统一的终端输出样式。诊断日志走 `tracing`（stderr），
//! 这里只负责面向用户的状态行。
//!
//! ## 依赖关系
//! - 被所有 `commands/` 模块使用
//! - 使用 `colored` crate

use crate::models::ResultRecord;
use colored::Colorize;

pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERR]".red().bold(), msg);
}

pub fn print_warning(msg: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), msg);
}

pub fn print_info(msg: &str) {
    println!("{} {}", "[*]".blue().bold(), msg);
}

pub fn print_done(msg: &str) {
    println!("{} {}", "[DONE]".green().bold(), msg);
}

/// 结果记录的一行结论：收敛 / 未收敛 / 失败
pub fn print_outcome(record: &ResultRecord) {
    let code = record.exit_code();
    let tag = format!("[{}]", code);
    if code == 0 {
        println!("{} {}", tag.green().bold(), "finished and converged");
    } else if record.is_not_converged() {
        println!("{} {}", tag.yellow().bold(), "SCF did not converge");
    } else {
        let reason = record
            .failure_kind
            .map(|k| k.description())
            .unwrap_or("failed");
        eprintln!("{} {}", tag.red().bold(), reason);
    }
}

/// 打印标题栏
pub fn print_header(title: &str) {
    let line = "─".repeat(60);
    println!("\n{}", line.dimmed());
    println!("  {}", title.bold());
    println!("{}\n", line.dimmed());
}

pub fn print_separator() {
    println!("{}", "─".repeat(60).dimmed());
}
