//! # plot-dos 命令实现
//!
//! 使用 `plotters` 绘制 OLCAO 总态密度 (`*dos*.t.plot`)。
//!
//! ## 功能
//! - 输入可以是取回目录或 .t.plot 文件本身
//! - 可选能量窗口
//! - 支持 PNG 和 SVG 输出
//!
//! ## 依赖关系
//! - 使用 `cli/plot_dos.rs` 定义的参数
//! - 使用 `parsers/dos.rs`, `batch/collector.rs`, `utils/output.rs`

use crate::batch::FileCollector;
use crate::cli::plot_dos::PlotDosArgs;
use crate::error::{OlcaoError, Result};
use crate::parsers::dos::{parse_dos_file, DosCurve};
use crate::utils::output;

use plotters::prelude::*;
use std::path::{Path, PathBuf};

const TOTAL_DOS_PATTERN: &str = "*dos*.t.plot";

/// 执行 plot-dos 命令
pub fn execute(args: PlotDosArgs) -> Result<i32> {
    let input = find_dos_file(&args.input)?;
    output::print_info(&format!("Reading {}", input.display()));

    let mut curve = parse_dos_file(&input)?;
    if let Some(window) = &args.window {
        let (lo, hi) = parse_window(window)?;
        curve.points.retain(|(e, _)| *e >= lo && *e <= hi);
    }

    if curve.is_empty() {
        return Err(OlcaoError::Other(format!(
            "no DOS data points in '{}'",
            input.display()
        )));
    }

    if args.svg {
        let root = SVGBackend::new(&args.output, (args.width, args.height)).into_drawing_area();
        draw_dos_chart(&root, &curve, &args.title)?;
        root.present()
            .map_err(|e| OlcaoError::Other(e.to_string()))?;
    } else {
        let root =
            BitMapBackend::new(&args.output, (args.width, args.height)).into_drawing_area();
        draw_dos_chart(&root, &curve, &args.title)?;
        root.present()
            .map_err(|e| OlcaoError::Other(e.to_string()))?;
    }

    output::print_success(&format!("DOS plot saved to '{}'", args.output.display()));
    Ok(0)
}

/// 目录时取第一个匹配的总 DOS 文件
fn find_dos_file(input: &Path) -> Result<PathBuf> {
    if input.is_file() {
        return Ok(input.to_path_buf());
    }
    if !input.is_dir() {
        return Err(OlcaoError::FileNotFound {
            path: input.display().to_string(),
        });
    }

    FileCollector::new(input.to_path_buf())
        .with_pattern(TOTAL_DOS_PATTERN)
        .collect()
        .into_iter()
        .next()
        .ok_or_else(|| OlcaoError::FileNotFound {
            path: input.join(TOTAL_DOS_PATTERN).display().to_string(),
        })
}

/// `min:max`
fn parse_window(window: &str) -> Result<(f64, f64)> {
    let invalid = || OlcaoError::InvalidArgument(format!("invalid energy window '{}'", window));
    let (lo, hi) = window.split_once(':').ok_or_else(invalid)?;
    let lo: f64 = lo.trim().parse().map_err(|_| invalid())?;
    let hi: f64 = hi.trim().parse().map_err(|_| invalid())?;
    if lo >= hi {
        return Err(invalid());
    }
    Ok((lo, hi))
}

fn draw_dos_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    curve: &DosCurve,
    title: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| OlcaoError::Other(format!("{:?}", e)))?;

    let (x_min, x_max) = match curve.energy_range() {
        Some((lo, hi)) if hi > lo => (lo, hi),
        Some((e, _)) => (e - 1.0, e + 1.0),
        None => (-20.0, 20.0),
    };
    let y_max = curve.max_dos().max(1e-6) * 1.1;

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, 0.0..y_max)
        .map_err(|e| OlcaoError::Other(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc("Energy (eV)")
        .y_desc("DOS (states/eV)")
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(|e| OlcaoError::Other(format!("{:?}", e)))?;

    let line_color = RGBColor(0, 102, 204);
    chart
        .draw_series(AreaSeries::new(
            curve.points.iter().copied(),
            0.0,
            line_color.mix(0.2),
        ))
        .map_err(|e| OlcaoError::Other(format!("{:?}", e)))?;

    chart
        .draw_series(LineSeries::new(
            curve.points.iter().copied(),
            line_color.stroke_width(2),
        ))
        .map_err(|e| OlcaoError::Other(format!("{:?}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_window() {
        assert_eq!(parse_window("-5:10").unwrap(), (-5.0, 10.0));
        assert!(parse_window("10:-5").is_err());
        assert!(parse_window("abc").is_err());
    }

    #[test]
    fn test_find_dos_file_in_directory() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("gs_dos-fb.p.raw"), "").unwrap();
        fs::write(tmp.path().join("gs_dos-fb.t.plot"), "").unwrap();

        let found = find_dos_file(tmp.path()).unwrap();
        assert_eq!(found, tmp.path().join("gs_dos-fb.t.plot"));
        assert!(find_dos_file(&tmp.path().join("missing")).is_err());
    }
}
