//! # plot-dos 子命令 CLI 定义
//!
//! 绘制取回目录中的总态密度曲线
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/plot_dos.rs`

use clap::Args;
use std::path::PathBuf;

/// plot-dos 子命令参数
#[derive(Args, Debug)]
pub struct PlotDosArgs {
    /// Retrieved directory (searched for '*dos*.t.plot') or the plot file itself
    pub input: PathBuf,

    /// Output image file
    #[arg(short, long, default_value = "dos.png")]
    pub output: PathBuf,

    /// Write SVG instead of PNG
    #[arg(long, default_value_t = false)]
    pub svg: bool,

    /// Chart title
    #[arg(long, default_value = "Total Density of States")]
    pub title: String,

    /// Image width in pixels
    #[arg(long, default_value_t = 1000)]
    pub width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 700)]
    pub height: u32,

    /// Energy window 'min:max' (default: full range)
    #[arg(long)]
    pub window: Option<String>,
}
