//! # 总态密度 (.t.plot) 解析器
//!
//! OLCAO 的 DOS 输出是空白分隔的列数据，第一行为 `ENERGY ...` 表头。
//! 这里只取前两列：能量与总态密度。
//!
//! ## 依赖关系
//! - 被 `commands/plot_dos.rs` 使用

use crate::error::{OlcaoError, Result};
use std::fs;
use std::path::Path;

/// 能量 - 态密度序列
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DosCurve {
    pub points: Vec<(f64, f64)>,
}

impl DosCurve {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn energy_range(&self) -> Option<(f64, f64)> {
        let min = self.points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let max = self
            .points
            .iter()
            .map(|p| p.0)
            .fold(f64::NEG_INFINITY, f64::max);
        (min.is_finite() && max.is_finite()).then_some((min, max))
    }

    pub fn max_dos(&self) -> f64 {
        self.points.iter().map(|p| p.1).fold(0.0, f64::max)
    }
}

pub fn parse_dos_content(content: &str) -> DosCurve {
    let points = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.to_uppercase().starts_with("ENERGY"))
        .filter_map(|l| {
            let mut cols = l.split_whitespace();
            let energy = cols.next()?.parse::<f64>().ok()?;
            let dos = cols.next()?.parse::<f64>().ok()?;
            Some((energy, dos))
        })
        .collect();

    DosCurve { points }
}

pub fn parse_dos_file(path: &Path) -> Result<DosCurve> {
    let content = fs::read_to_string(path).map_err(|e| OlcaoError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(parse_dos_content(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_total_dos() {
        let content = r#"
ENERGY       TOTAL     C_1
# comment
-10.0  0.10  0.05
  0.0  1.50  0.75
 10.0  0.20  0.10
bad line here
"#;
        let curve = parse_dos_content(content);
        assert_eq!(curve.points.len(), 3);
        assert_eq!(curve.points[1], (0.0, 1.5));
        assert_eq!(curve.energy_range(), Some((-10.0, 10.0)));
        assert_eq!(curve.max_dos(), 1.5);
    }

    #[test]
    fn test_empty_curve() {
        let curve = parse_dos_content("ENERGY TOTAL\n");
        assert!(curve.is_empty());
        assert!(curve.energy_range().is_none());
    }
}
