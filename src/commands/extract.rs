//! # extract 命令实现
//!
//! 解析单个取回目录，打印结果记录，退出码与记录一致。
//!
//! ## 依赖关系
//! - 使用 `cli/extract.rs` 定义的参数
//! - 使用 `extractor/`, `utils/output.rs`

use crate::cli::extract::ExtractArgs;
use crate::commands::prepare::PLAN_FILE;
use crate::error::{OlcaoError, Result};
use crate::extractor::{ExtractOptions, Extractor};
use crate::models::{JobPlan, Quantity, ResultRecord};
use crate::utils::output;

use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// 执行 extract 命令
pub fn execute(args: ExtractArgs) -> Result<i32> {
    let plan_path = resolve_plan_path(&args.retrieved, args.plan.as_deref())?;
    let plan = JobPlan::read_from(&plan_path)?;

    let extractor = Extractor::new(ExtractOptions {
        max_iterations: args.max_iterations,
    });
    let record = extractor.extract(&args.retrieved, &plan);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        output::print_header(&format!("Result: {}", args.retrieved.display()));
        print_record(&record);
    }

    Ok(record.exit_code())
}

/// 未显式给出时，依次查找取回目录内和它的上一级
fn resolve_plan_path(retrieved: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let inside = retrieved.join(PLAN_FILE);
    let beside = retrieved.parent().map(|p| p.join(PLAN_FILE));

    std::iter::once(inside)
        .chain(beside)
        .find(|p| p.is_file())
        .ok_or_else(|| OlcaoError::FileNotFound {
            path: format!("{} (pass --plan)", retrieved.join(PLAN_FILE).display()),
        })
}

fn show(q: &Option<Quantity>) -> String {
    q.as_ref().map(|q| q.to_string()).unwrap_or_else(|| "-".to_string())
}

/// 打印结果记录
pub fn print_record(record: &ResultRecord) {
    let rows = vec![
        FieldRow {
            field: "Outcome",
            value: record.outcome_label(),
        },
        FieldRow {
            field: "Exit code",
            value: record.exit_code().to_string(),
        },
        FieldRow {
            field: "Output file",
            value: record.output_file.clone().unwrap_or_else(|| "-".to_string()),
        },
        FieldRow {
            field: "Total energy",
            value: show(&record.total_energy),
        },
        FieldRow {
            field: "Fermi energy",
            value: show(&record.fermi_energy),
        },
        FieldRow {
            field: "Band gap",
            value: show(&record.band_gap),
        },
        FieldRow {
            field: "Energy units",
            value: record.energy_units.clone(),
        },
        FieldRow {
            field: "Atoms",
            value: record.num_atoms.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string()),
        },
        FieldRow {
            field: "Electrons",
            value: record
                .num_electrons
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
        },
        FieldRow {
            field: "SCF iterations",
            value: record
                .num_iterations
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
        },
        FieldRow {
            field: "Converged",
            value: record.converged.to_string(),
        },
        FieldRow {
            field: "Property files",
            value: record.property_files.join(", "),
        },
    ];
    println!("{}", Table::new(rows));

    if let Some(msg) = &record.error_message {
        output::print_error(msg);
    }
    for warning in &record.warnings {
        output::print_warning(warning);
    }

    output::print_outcome(record);
}
