//! # OLCAO 文本输出解析器
//!
//! 从 `gs_scf-fb.out`、`summary` 等文本文件中提取带标签的数值字段。
//! 每个字段一个行首锚定的正则，标签中的空白/下划线、可选的 `=`/`:`、
//! 括号内或数值后的单位都可以容忍。单位原样保留，不做换算。
//! 找不到的字段为 `None`，不是错误。
//!
//! ## 依赖关系
//! - 被 `extractor/` 使用
//! - 使用 `models/result.rs` 的 `Quantity`

use crate::error::{OlcaoError, Result};
use crate::models::Quantity;
use regex::{Captures, Regex};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// 错误上下文的最大长度（字符）
const ERROR_CONTEXT_LIMIT: usize = 500;

const NUMBER: &str = r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eEdD][-+]?\d+)?";
const COUNT_PREFIX: &str = r"(?:NUM(?:BER)?[ \t_]*(?:OF)?[ \t_]*)?";

/// 数值后不带括号时只认这些单位
const BARE_ENERGY_UNITS: &[&str] = &["Ha", "Hartree", "eV", "Ry", "Ryd", "au", "a.u."];

/// 从一个输出文件中解析出的字段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputFields {
    pub total_energy: Option<Quantity>,
    pub fermi_energy: Option<Quantity>,
    pub band_gap: Option<Quantity>,
    pub num_atoms: Option<u32>,
    pub num_electrons: Option<f64>,
    pub num_iterations: Option<u32>,
    /// 显式收敛标记：Some(true) 收敛，Some(false) 未收敛
    pub convergence: Option<bool>,
    /// 求解器报错的上下文
    pub error: Option<String>,
}

impl OutputFields {
    /// 用另一个来源补齐缺失字段（已有的值优先）
    pub fn fill_missing(&mut self, other: OutputFields) {
        if self.total_energy.is_none() {
            self.total_energy = other.total_energy;
        }
        if self.fermi_energy.is_none() {
            self.fermi_energy = other.fermi_energy;
        }
        if self.band_gap.is_none() {
            self.band_gap = other.band_gap;
        }
        if self.num_atoms.is_none() {
            self.num_atoms = other.num_atoms;
        }
        if self.num_electrons.is_none() {
            self.num_electrons = other.num_electrons;
        }
        if self.num_iterations.is_none() {
            self.num_iterations = other.num_iterations;
        }
        if self.convergence.is_none() {
            self.convergence = other.convergence;
        }
        if self.error.is_none() {
            self.error = other.error;
        }
    }
}

struct Matchers {
    total_energy: Regex,
    fermi_energy: Regex,
    band_gap: Regex,
    num_atoms: Regex,
    num_electrons: Regex,
    iteration: Regex,
    not_converged: Vec<Regex>,
    converged: Vec<Regex>,
    errors: Vec<Regex>,
}

fn matchers() -> &'static Matchers {
    static MATCHERS: OnceLock<Matchers> = OnceLock::new();
    MATCHERS.get_or_init(|| Matchers {
        total_energy: quantity_regex(r"TOTAL[ \t_]+ENERGY"),
        fermi_energy: quantity_regex(r"FERMI[ \t_]+(?:ENERGY|LEVEL)"),
        band_gap: quantity_regex(r"BAND[ \t_]*GAP"),
        num_atoms: count_regex("ATOMS", r"\d+"),
        num_electrons: count_regex("ELECTRONS", r"[-+]?\d+(?:\.\d*)?"),
        iteration: count_regex(r"ITER(?:ATION)?S?", r"\d+"),
        not_converged: vec![
            token_regex(r"\bNOT[ \t]+CONVERGED\b"),
            token_regex(r"\bCONVERGENCE[ \t]+NOT[ \t]+(?:REACHED|ACHIEVED)\b"),
            token_regex(r"\bFAILED[ \t]+TO[ \t]+CONVERGE\b"),
        ],
        converged: vec![
            token_regex(r"\b(?:SCF[ \t]+)?CONVERGED\b"),
            token_regex(r"\bCONVERGENCE[ \t]+(?:REACHED|ACHIEVED)\b"),
        ],
        errors: vec![
            token_regex(r"^[ \t]*ERROR[ \t]*:"),
            token_regex(r"\bFATAL[ \t]+ERROR\b"),
            token_regex(r"\bSCF[ \t]+FAILED\b"),
            token_regex(r"\bCALCULATION[ \t]+FAILED\b"),
        ],
    })
}

/// `LABEL [(unit)] [=|:] value [(unit)|unit]`
fn quantity_regex(label: &str) -> Regex {
    let pattern = format!(
        r"(?im)^[ \t]*{label}[ \t]*(?:\((?P<pre>[^)\n]*)\))?[ \t]*[=:]?[ \t]*(?P<value>{NUMBER})(?:[ \t]*(?:\((?P<paren>[^)\n]*)\)|(?P<bare>[A-Za-z][A-Za-z0-9/*^.\-]*)))?"
    );
    Regex::new(&pattern).expect("quantity pattern is valid")
}

/// `[NUMBER OF] LABEL [=|:|#] value`
fn count_regex(label: &str, value: &str) -> Regex {
    let pattern = format!(
        r"(?im)^[ \t]*{COUNT_PREFIX}{label}[ \t]*[=:#]?[ \t]*(?P<value>{value})\b"
    );
    Regex::new(&pattern).expect("count pattern is valid")
}

fn token_regex(pattern: &str) -> Regex {
    Regex::new(&format!("(?im){}", pattern)).expect("token pattern is valid")
}

/// Fortran 风格的 `1.0D-05` 也能解析
fn parse_number(s: &str) -> Option<f64> {
    s.replace(['d', 'D'], "e").parse().ok()
}

fn quantity_from(caps: &Captures) -> Option<Quantity> {
    let value = parse_number(caps.name("value")?.as_str())?;
    let bare = caps
        .name("bare")
        .map(|m| m.as_str())
        .filter(|u| BARE_ENERGY_UNITS.iter().any(|k| k.eq_ignore_ascii_case(u)));
    let units = caps
        .name("pre")
        .or_else(|| caps.name("paren"))
        .map(|m| m.as_str())
        .or(bare)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    Some(Quantity::new(value, units))
}

/// 取最后一次出现的值（SCF 过程中会多次打印，最后一次为最终值）
fn last_quantity(re: &Regex, text: &str) -> Option<Quantity> {
    re.captures_iter(text).filter_map(|c| quantity_from(&c)).last()
}

fn last_value<T: std::str::FromStr>(re: &Regex, text: &str) -> Option<T> {
    re.captures_iter(text)
        .filter_map(|c| c.name("value")?.as_str().parse().ok())
        .last()
}

/// 检查收敛标记，先检查否定形式
fn detect_convergence(m: &Matchers, text: &str) -> Option<bool> {
    if m.not_converged.iter().any(|re| re.is_match(text)) {
        Some(false)
    } else if m.converged.iter().any(|re| re.is_match(text)) {
        Some(true)
    } else {
        None
    }
}

/// 找到第一个报错标记，返回从该行起到下一个空行为止的内容
fn detect_error(m: &Matchers, text: &str) -> Option<String> {
    let start = m
        .errors
        .iter()
        .filter_map(|re| re.find(text))
        .map(|mat| mat.start())
        .min()?;

    let line_start = text[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let context: Vec<&str> = text[line_start..]
        .lines()
        .take_while(|l| !l.trim().is_empty())
        .map(str::trim)
        .collect();

    Some(context.join("\n").chars().take(ERROR_CONTEXT_LIMIT).collect())
}

/// 解析输出文本
pub fn parse_output_content(text: &str) -> OutputFields {
    let m = matchers();

    OutputFields {
        total_energy: last_quantity(&m.total_energy, text),
        fermi_energy: last_quantity(&m.fermi_energy, text),
        band_gap: last_quantity(&m.band_gap, text),
        num_atoms: last_value(&m.num_atoms, text),
        num_electrons: last_value(&m.num_electrons, text),
        num_iterations: m
            .iteration
            .captures_iter(text)
            .filter_map(|c| c.name("value")?.as_str().parse::<u32>().ok())
            .max(),
        convergence: detect_convergence(m, text),
        error: detect_error(m, text),
    }
}

/// 解析输出文件（非 UTF-8 字节按替换字符处理）
pub fn parse_output_file(path: &Path) -> Result<OutputFields> {
    let bytes = fs::read(path).map_err(|e| OlcaoError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(parse_output_content(&String::from_utf8_lossy(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_energy_with_bare_unit() {
        let f = parse_output_content("TOTAL ENERGY -45.768046 Ha\nFERMI ENERGY 0.234567 Ha\n");
        let e = f.total_energy.unwrap();
        assert_eq!(e.value, -45.768046);
        assert_eq!(e.units.as_deref(), Some("Ha"));
        assert_eq!(f.fermi_energy.unwrap().value, 0.234567);
    }

    #[test]
    fn test_total_energy_equals_and_underscore() {
        let f = parse_output_content("    TOTAL ENERGY = -123.456789\n");
        let e = f.total_energy.unwrap();
        assert_eq!(e.value, -123.456789);
        assert!(e.units.is_none());

        let f = parse_output_content("TOTAL_ENERGY = -99.8765");
        assert_eq!(f.total_energy.unwrap().value, -99.8765);
    }

    #[test]
    fn test_parenthesised_units() {
        let f = parse_output_content("Total   Energy (Hartree):   -1.5E+01\nBAND GAP = 1.234 (eV)\n");
        let e = f.total_energy.unwrap();
        assert_eq!(e.value, -15.0);
        assert_eq!(e.units.as_deref(), Some("Hartree"));

        let gap = f.band_gap.unwrap();
        assert_eq!(gap.value, 1.234);
        assert_eq!(gap.units.as_deref(), Some("eV"));
    }

    #[test]
    fn test_trailing_words_are_not_units() {
        let f = parse_output_content(
            "TOTAL ENERGY = -45.768046 after 12 iterations\nFERMI ENERGY = 0.2 is the level\n",
        );
        let e = f.total_energy.unwrap();
        assert_eq!(e.value, -45.768046);
        assert!(e.units.is_none());
        assert!(f.fermi_energy.unwrap().units.is_none());

        let f = parse_output_content("TOTAL ENERGY = -1.5 a.u.\nFERMI ENERGY = 0.1 eV\n");
        assert_eq!(f.total_energy.unwrap().units.as_deref(), Some("a.u."));
        assert_eq!(f.fermi_energy.unwrap().units.as_deref(), Some("eV"));
    }

    #[test]
    fn test_fortran_exponent() {
        let f = parse_output_content("TOTAL ENERGY = -0.45768046D+02 Ha");
        assert!((f.total_energy.unwrap().value + 45.768046).abs() < 1e-9);
    }

    #[test]
    fn test_last_energy_wins() {
        let text = "TOTAL ENERGY = -40.0\nTOTAL ENERGY = -45.5\n";
        assert_eq!(parse_output_content(text).total_energy.unwrap().value, -45.5);
    }

    #[test]
    fn test_label_must_start_the_line() {
        let f = parse_output_content("previous TOTAL ENERGY = -1.0 was discarded");
        assert!(f.total_energy.is_none());
    }

    #[test]
    fn test_counts() {
        let f = parse_output_content("NUMBER OF ATOMS = 8\nNUM_ELECTRONS = 48.0\n");
        assert_eq!(f.num_atoms, Some(8));
        assert_eq!(f.num_electrons, Some(48.0));

        let f = parse_output_content("Number of atoms: 2\nelectrons : 8\n");
        assert_eq!(f.num_atoms, Some(2));
        assert_eq!(f.num_electrons, Some(8.0));
    }

    #[test]
    fn test_iterations_and_convergence() {
        let text = r#"
    ITERATION 1: energy = -100.0
    ITERATION 2: energy = -110.0
    ITERATION 3: energy = -115.0
    ITERATION 4: energy = -115.5
    SCF CONVERGED
"#;
        let f = parse_output_content(text);
        assert_eq!(f.num_iterations, Some(4));
        assert_eq!(f.convergence, Some(true));
        assert!(f.error.is_none());
    }

    #[test]
    fn test_not_converged_checked_first() {
        let f = parse_output_content("ITERATION 100: energy = -100.0\nNOT CONVERGED\n");
        assert_eq!(f.num_iterations, Some(100));
        assert_eq!(f.convergence, Some(false));

        let f = parse_output_content("Convergence not reached after 50 steps");
        assert_eq!(f.convergence, Some(false));
    }

    #[test]
    fn test_no_convergence_token() {
        let f = parse_output_content("TOTAL ENERGY = -1.0\n");
        assert!(f.convergence.is_none());
        assert!(f.num_iterations.is_none());
    }

    #[test]
    fn test_error_detection() {
        let text = r#"
    Starting calculation...
    ERROR: SCF failed to converge after 100 iterations
    Calculation aborted.

    trailing noise
"#;
        let f = parse_output_content(text);
        let msg = f.error.unwrap();
        assert!(msg.starts_with("ERROR: SCF failed"));
        assert!(msg.contains("Calculation aborted."));
        assert!(!msg.contains("trailing noise"));
    }

    #[test]
    fn test_error_word_inside_line_is_not_a_marker() {
        let f = parse_output_content("Convergence error: 1.0e-6\n");
        assert!(f.error.is_none());
    }

    #[test]
    fn test_fill_missing_keeps_existing() {
        let mut primary = parse_output_content("TOTAL ENERGY = -2.0 Ha\n");
        let summary = parse_output_content("TOTAL ENERGY = -3.0 Ha\nNUMBER OF ATOMS = 4\n");
        primary.fill_missing(summary);
        assert_eq!(primary.total_energy.unwrap().value, -2.0);
        assert_eq!(primary.num_atoms, Some(4));
    }
}
