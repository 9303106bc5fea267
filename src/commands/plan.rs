//! # plan 命令实现
//!
//! 解析骨架文件和参数，打印作业计划。
//!
//! ## 依赖关系
//! - 使用 `cli/plan.rs` 定义的参数
//! - 使用 `planner/`, `parsers/skeleton.rs`, `utils/output.rs`

use crate::cli::plan::PlanArgs;
use crate::error::Result;
use crate::models::{JobPlan, StructureDescriptor};
use crate::parsers::parse_skeleton_file;
use crate::planner;
use crate::utils::output;

use tabled::{Table, Tabled};

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct PatternRow {
    #[tabled(rename = "Pattern")]
    glob: String,
    #[tabled(rename = "Role")]
    role: String,
}

/// 执行 plan 命令
pub fn execute(args: PlanArgs) -> Result<i32> {
    let structure = parse_skeleton_file(&args.skeleton)?;
    let params = args.params.to_parameters()?;

    let mut job = planner::plan(&params, &structure)?;
    if args.checkpoints {
        job = job.with_checkpoint_retrieval();
    }

    if args.json {
        println!("{}", job.to_json()?);
        return Ok(0);
    }

    print_plan(&job, &structure);
    Ok(0)
}

/// 以表格形式打印计划
pub fn print_plan(job: &JobPlan, structure: &StructureDescriptor) {
    output::print_header(&format!(
        "OLCAO {} job for {}",
        job.calculation_type(),
        structure.formula()
    ));

    let (scratch_var, scratch_value) = job.scratch_env();
    let rows = vec![
        FieldRow {
            field: "Staged input".to_string(),
            value: job.staged_input_name().to_string(),
        },
        FieldRow {
            field: "Preprocessor".to_string(),
            value: job.preprocessor_command("makeinput"),
        },
        FieldRow {
            field: "Solver".to_string(),
            value: job.solver_command("uolcao"),
        },
        FieldRow {
            field: "Edge".to_string(),
            value: job.edge().to_string(),
        },
        FieldRow {
            field: "Basis (SCF / post-SCF)".to_string(),
            value: format!("{} / {}", job.basis_scf(), job.basis_pscf()),
        },
        FieldRow {
            field: "Scratch".to_string(),
            value: format!("{}={}", scratch_var, scratch_value),
        },
    ];
    println!("{}", Table::new(rows));

    let patterns: Vec<PatternRow> = job
        .expected_outputs()
        .iter()
        .map(|p| PatternRow {
            glob: p.glob.clone(),
            role: format!("{:?}", p.role),
        })
        .collect();
    println!("{}", Table::new(patterns));
}
