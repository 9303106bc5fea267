//! # prepare 命令实现
//!
//! 生成 OLCAO 作业目录，不提交。
//!
//! ## 功能
//! - 写入暂存骨架 `olcao.skl`
//! - 写入 `plan.json`（提取时使用）和 `retrieve.list`
//! - 生成 sbatch 脚本
//! - `--calculations` 时按 SCF + post-SCF 工作流生成多个子目录
//!
//! ## 依赖关系
//! - 使用 `cli/prepare.rs` 定义的参数
//! - 使用 `planner/`, `workflow.rs`, `utils/slurm.rs`, `utils/output.rs`

use crate::cli::prepare::PrepareArgs;
use crate::error::{OlcaoError, Result};
use crate::models::{CalculationType, JobPlan, StructureDescriptor};
use crate::parsers::{parse_skeleton_file, to_skeleton_string};
use crate::planner;
use crate::utils::output;
use crate::utils::slurm::generate_sbatch_script;
use crate::workflow;

use std::fs;
use std::path::Path;

pub const PLAN_FILE: &str = "plan.json";
pub const RETRIEVE_LIST_FILE: &str = "retrieve.list";
pub const SBATCH_FILE: &str = "submit.sbatch";

/// 执行 prepare 命令
pub fn execute(args: PrepareArgs) -> Result<i32> {
    output::print_header("Preparing OLCAO Jobs");

    let structure = parse_skeleton_file(&args.skeleton)?;
    output::print_info(&format!(
        "Loaded skeleton '{}' ({} atoms, {})",
        args.skeleton.display(),
        structure.num_atoms(),
        structure.formula()
    ));

    match &args.calculations {
        None => {
            let params = args.params.to_parameters()?;
            let job = planner::plan(&params, &structure)?;
            write_job_dir(&args, &args.output_dir, job, &structure)?;
        }
        Some(names) => {
            if args.params.calculation_type.is_some() {
                output::print_warning("--type is ignored when --calculations is given");
            }
            let post_types = names
                .iter()
                .map(|s| s.parse::<CalculationType>())
                .collect::<Result<Vec<_>>>()?;

            let base = args.params.to_builder()?;
            let stages = workflow::plan_workflow(&base, &post_types, &structure)?;
            for stage in stages {
                let dir = args.output_dir.join(stage.calculation_type.name());
                write_job_dir(&args, &dir, stage.plan, &structure)?;
            }
        }
    }

    output::print_separator();
    output::print_done("Jobs prepared (not submitted)");
    Ok(0)
}

/// 写出一个作业目录
fn write_job_dir(
    args: &PrepareArgs,
    dir: &Path,
    job: JobPlan,
    structure: &StructureDescriptor,
) -> Result<()> {
    let plan_path = dir.join(PLAN_FILE);
    if plan_path.exists() && !args.force {
        return Err(OlcaoError::InvalidArgument(format!(
            "'{}' already contains a job (use --force to overwrite)",
            dir.display()
        )));
    }

    fs::create_dir_all(dir).map_err(|e| OlcaoError::FileWriteError {
        path: dir.display().to_string(),
        source: e,
    })?;

    let job = if args.checkpoints {
        job.with_checkpoint_retrieval()
    } else {
        job
    };

    let job_name = format!("{}_{}", structure.formula(), job.calculation_type());
    let slurm = args.slurm.to_config(&job_name);
    let env = args.env.to_environment();

    write_file(&dir.join(job.staged_input_name()), &to_skeleton_string(structure))?;
    write_file(&plan_path, &job.to_json()?)?;

    let mut retrieve = job.retrieve_list(&slurm.scheduler_files()).join("\n");
    retrieve.push('\n');
    write_file(&dir.join(RETRIEVE_LIST_FILE), &retrieve)?;

    let script = generate_sbatch_script(&slurm, dir, &env, &job);
    write_file(&dir.join(SBATCH_FILE), &script)?;

    output::print_success(&format!(
        "{}: {} | {}",
        dir.display(),
        job.preprocessor_command(&env.makeinput),
        job.solver_command(&env.uolcao)
    ));
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| OlcaoError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}
