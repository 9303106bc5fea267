//! # 按计算类型划分的输出文件表
//!
//! 所有表都是对 `CalculationType` 的穷尽 `match`，新增类型时编译器会提示补全。

use crate::models::{Basis, CalculationType, Edge, OutputPattern, OutputRole};
use crate::models::plan::PREPROCESS_MARKER_FILE;

/// 每次运行都会产生的文件
pub fn always_present(edge: &Edge) -> Vec<OutputPattern> {
    vec![
        OutputPattern::new(format!("{}_*-*.out", edge), OutputRole::MainOutput),
        OutputPattern::new(format!("{}_scf-*.energy", edge), OutputRole::EnergyTrace),
        OutputPattern::new(format!("{}_scf-*.iter", edge), OutputRole::IterationTrace),
        OutputPattern::new("summary", OutputRole::Summary),
        OutputPattern::new("timing", OutputRole::Timing),
    ]
}

pub fn preprocess_marker() -> OutputPattern {
    OutputPattern::new(PREPROCESS_MARKER_FILE, OutputRole::PreprocessMarker)
}

/// 计算类型专属的属性文件后缀
fn property_suffixes(calculation_type: CalculationType) -> &'static [&'static str] {
    match calculation_type {
        CalculationType::Scf => &[],
        CalculationType::Dos => &["t.plot", "p.raw"],
        CalculationType::Bond => &["raw"],
        CalculationType::Sybd => &["plot"],
        CalculationType::Optc => &["plot", "eps1.plot", "elf.plot"],
        CalculationType::Pacs => &["plot", "raw"],
        CalculationType::Field => &["dx"],
        CalculationType::Force => &["dat"],
        CalculationType::Nlop => &["plot"],
        CalculationType::Sige => &["plot"],
        CalculationType::Loen => &["raw"],
    }
}

/// `<edge>_<type>-<basis>.<suffix>`
pub fn property_outputs(
    calculation_type: CalculationType,
    edge: &Edge,
    basis: Basis,
) -> Vec<OutputPattern> {
    property_suffixes(calculation_type)
        .iter()
        .map(|suffix| {
            OutputPattern::new(
                format!(
                    "{}_{}-{}.{}",
                    edge,
                    calculation_type,
                    basis.file_suffix(),
                    suffix
                ),
                OutputRole::Property,
            )
        })
        .collect()
}
