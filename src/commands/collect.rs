//! # collect 命令实现
//!
//! 并行提取作业根目录下所有作业的结果，输出汇总表格和 CSV。
//!
//! ## 功能
//! - 按 `plan.json` 识别作业目录
//! - rayon 并行提取，单个作业失败不影响其他作业
//! - 终端表格 + CSV 汇总
//! - `prepare --calculations` 生成的工作流（`scf/` 与同级阶段目录）按组评估，
//!   SCF 失败或未收敛时退出码为 SCF 的退出码
//!
//! ## 依赖关系
//! - 使用 `cli/collect.rs` 定义的参数
//! - 使用 `batch/`, `extractor/`, `workflow.rs`, `utils/output.rs`

use crate::batch::{BatchResult, BatchRunner, FileCollector, ProcessResult};
use crate::cli::collect::CollectArgs;
use crate::commands::prepare::PLAN_FILE;
use crate::error::{OlcaoError, Result};
use crate::extractor::{ExtractOptions, Extractor};
use crate::models::{CalculationType, JobPlan, ResultRecord};
use crate::utils::output;
use crate::workflow::{WorkflowOutcome, WorkflowSummary};

use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

/// 单个作业的提取结果
struct JobEntry {
    name: String,
    dir: PathBuf,
    calculation_type: Option<CalculationType>,
    /// plan.json 不可读时为 Err
    record: std::result::Result<ResultRecord, String>,
}

impl JobEntry {
    fn process_result(&self) -> ProcessResult {
        match &self.record {
            Err(e) => ProcessResult::Failed(self.name.clone(), e.clone()),
            Ok(r) if !r.is_ok() => ProcessResult::Failed(
                self.name.clone(),
                format!("{} (exit {})", r.outcome_label(), r.exit_code()),
            ),
            Ok(r) if !r.converged => ProcessResult::NotConverged,
            Ok(_) => ProcessResult::Success,
        }
    }

    fn type_label(&self) -> String {
        self.calculation_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    /// 目录名与计算类型一致时视为工作流的一个阶段
    fn stage_of(&self, parent: &Path) -> Option<(CalculationType, &ResultRecord)> {
        let t = self.calculation_type?;
        let record = self.record.as_ref().ok()?;
        let named_after_type = self.dir.file_name().is_some_and(|n| n == t.name());
        (named_after_type && self.dir.parent() == Some(parent)).then_some((t, record))
    }
}

/// 一组工作流阶段的评估结果
struct WorkflowGroup {
    name: String,
    summary: WorkflowSummary,
}

/// 汇总表格行
#[derive(Debug, Clone, Tabled)]
struct SummaryRow {
    #[tabled(rename = "Job")]
    job: String,
    #[tabled(rename = "Type")]
    calculation_type: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Exit")]
    exit_code: String,
    #[tabled(rename = "Total Energy")]
    total_energy: String,
    #[tabled(rename = "Fermi Energy")]
    fermi_energy: String,
    #[tabled(rename = "Iter")]
    iterations: String,
}

/// 执行 collect 命令
pub fn execute(args: CollectArgs) -> Result<i32> {
    output::print_header("Collecting OLCAO Results");

    if !args.jobs_root.is_dir() {
        return Err(OlcaoError::DirectoryNotFound {
            path: args.jobs_root.display().to_string(),
        });
    }

    let job_dirs: Vec<PathBuf> = FileCollector::new(args.jobs_root.clone())
        .with_pattern(PLAN_FILE)
        .max_depth(2)
        .recursive(args.recursive)
        .collect()
        .into_iter()
        .filter_map(|p| p.parent().map(Path::to_path_buf))
        .collect();

    if job_dirs.is_empty() {
        output::print_warning(&format!(
            "No job directories with {} found under '{}'",
            PLAN_FILE,
            args.jobs_root.display()
        ));
        return Ok(0);
    }
    output::print_info(&format!("Found {} job directories", job_dirs.len()));

    let extractor = Extractor::new(ExtractOptions {
        max_iterations: args.max_iterations,
    });
    let runner = BatchRunner::new(args.jobs);
    let entries = runner.run(job_dirs, |dir| {
        extract_job(&extractor, &args.jobs_root, dir, &args.retrieved_subdir)
    })?;

    let mut summary = BatchResult::default();
    for entry in &entries {
        summary.merge(entry.process_result());
    }

    let rows: Vec<SummaryRow> = entries.iter().map(summary_row).collect();
    println!("{}", Table::new(&rows));

    save_results_csv(&entries, &args.output)?;
    output::print_success(&format!("Summary saved to '{}'", args.output.display()));

    for (job, reason) in &summary.failures {
        output::print_warning(&format!("{}: {}", job, reason));
    }

    let workflows = group_workflows(&entries, &args.jobs_root);
    for group in &workflows {
        print_workflow(group);
    }
    output::print_separator();
    output::print_done(&format!(
        "{} jobs: {} converged, {} not converged, {} failed",
        summary.total(),
        summary.success,
        summary.not_converged,
        summary.failed
    ));

    let code = workflows
        .iter()
        .find(|g| !g.summary.is_success())
        .map(|g| g.summary.exit_code)
        .unwrap_or(0);
    Ok(code)
}

/// 找出含 `scf/` 与至少一个 post-SCF 同级阶段的目录，逐组评估
fn group_workflows(entries: &[JobEntry], root: &Path) -> Vec<WorkflowGroup> {
    entries
        .iter()
        .filter_map(|scf_entry| {
            let parent = scf_entry.dir.parent()?;
            let (CalculationType::Scf, scf) = scf_entry.stage_of(parent)? else {
                return None;
            };
            let post: Vec<(CalculationType, ResultRecord)> = entries
                .iter()
                .filter_map(|e| e.stage_of(parent))
                .filter(|(t, _)| t.is_post_scf())
                .map(|(t, r)| (t, r.clone()))
                .collect();
            if post.is_empty() {
                return None;
            }

            Some(WorkflowGroup {
                name: relative_name(root, parent),
                summary: WorkflowSummary::evaluate(scf, &post),
            })
        })
        .collect()
}

fn print_workflow(group: &WorkflowGroup) {
    let s = &group.summary;
    match s.outcome {
        WorkflowOutcome::Completed => {
            output::print_success(&format!("workflow {}: completed", group.name));
        }
        WorkflowOutcome::CompletedWithFailures => {
            let failed: Vec<&str> = s.failed_stages.iter().map(|t| t.name()).collect();
            output::print_warning(&format!(
                "workflow {}: completed, failed stages: {}",
                group.name,
                failed.join(", ")
            ));
        }
        WorkflowOutcome::ScfStopped => {
            output::print_error(&format!(
                "workflow {}: SCF stage did not finish (exit {}), later stages skipped",
                group.name, s.exit_code
            ));
        }
    }
}

fn relative_name(root: &Path, dir: &Path) -> String {
    dir.strip_prefix(root)
        .ok()
        .map(|p| p.display().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| dir.display().to_string())
}

fn extract_job(extractor: &Extractor, root: &Path, dir: &Path, retrieved_subdir: &str) -> JobEntry {
    let name = relative_name(root, dir);

    match JobPlan::read_from(&dir.join(PLAN_FILE)) {
        Ok(plan) => JobEntry {
            name,
            dir: dir.to_path_buf(),
            calculation_type: Some(plan.calculation_type()),
            record: Ok(extractor.extract(&dir.join(retrieved_subdir), &plan)),
        },
        Err(e) => JobEntry {
            name,
            dir: dir.to_path_buf(),
            calculation_type: None,
            record: Err(e.to_string()),
        },
    }
}

fn summary_row(entry: &JobEntry) -> SummaryRow {
    match &entry.record {
        Ok(r) => SummaryRow {
            job: entry.name.clone(),
            calculation_type: entry.type_label(),
            outcome: r.outcome_label(),
            exit_code: r.exit_code().to_string(),
            total_energy: r
                .total_energy
                .as_ref()
                .map(|q| q.to_string())
                .unwrap_or_else(|| "-".to_string()),
            fermi_energy: r
                .fermi_energy
                .as_ref()
                .map(|q| q.to_string())
                .unwrap_or_else(|| "-".to_string()),
            iterations: r
                .num_iterations
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
        },
        Err(_) => SummaryRow {
            job: entry.name.clone(),
            calculation_type: entry.type_label(),
            outcome: "INVALID PLAN".to_string(),
            exit_code: "-".to_string(),
            total_energy: "-".to_string(),
            fermi_energy: "-".to_string(),
            iterations: "-".to_string(),
        },
    }
}

/// 保存结果到 CSV
fn save_results_csv(entries: &[JobEntry], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record([
        "job",
        "calculation_type",
        "status",
        "exit_code",
        "total_energy",
        "energy_units",
        "fermi_energy",
        "band_gap",
        "num_atoms",
        "num_iterations",
        "converged",
        "error",
    ])?;

    for entry in entries {
        let row = match &entry.record {
            Ok(r) => vec![
                entry.name.clone(),
                entry.type_label(),
                r.outcome_label(),
                r.exit_code().to_string(),
                r.total_energy_value().map(|v| v.to_string()).unwrap_or_default(),
                r.energy_units.clone(),
                r.fermi_energy_value().map(|v| v.to_string()).unwrap_or_default(),
                r.band_gap.as_ref().map(|q| q.value.to_string()).unwrap_or_default(),
                r.num_atoms.map(|n| n.to_string()).unwrap_or_default(),
                r.num_iterations.map(|n| n.to_string()).unwrap_or_default(),
                r.converged.to_string(),
                r.error_message.clone().unwrap_or_default(),
            ],
            Err(e) => {
                let mut row = vec![String::new(); 12];
                row[0] = entry.name.clone();
                row[1] = entry.type_label();
                row[2] = "INVALID PLAN".to_string();
                row[11] = e.clone();
                row
            }
        };
        wtr.write_record(&row)?;
    }

    wtr.flush().map_err(|e| OlcaoError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, CalculationParameters, CellMode, Lattice, StructureDescriptor};
    use crate::planner;
    use std::fs;
    use tempfile::TempDir;

    fn write_job(root: &Path, name: &str, scf_output: Option<&str>) {
        write_stage(root, name, CalculationType::Scf, scf_output);
    }

    fn write_stage(
        root: &Path,
        name: &str,
        calculation_type: CalculationType,
        scf_output: Option<&str>,
    ) {
        let structure = StructureDescriptor {
            title: "Al".to_string(),
            lattice: Lattice::from_parameters(4.05, 4.05, 4.05, 90.0, 90.0, 90.0),
            atoms: vec![Atom::new("Al", [0.0, 0.0, 0.0])],
            space_group: "225_a".to_string(),
            supercell: [1, 1, 1],
            cell_mode: CellMode::Full,
        };
        let params = CalculationParameters::builder()
            .calculation_type(calculation_type)
            .build()
            .unwrap();
        let plan = planner::plan(&params, &structure).unwrap();

        let dir = root.join(name);
        fs::create_dir_all(dir.join("retrieved")).unwrap();
        fs::write(dir.join(PLAN_FILE), plan.to_json().unwrap()).unwrap();
        if let Some(text) = scf_output {
            fs::write(dir.join("retrieved/olcao.dat"), "").unwrap();
            fs::write(dir.join("retrieved/gs_scf-fb.out"), text).unwrap();
        }
    }

    fn collect_args(root: &Path) -> CollectArgs {
        CollectArgs {
            jobs_root: root.to_path_buf(),
            retrieved_subdir: "retrieved".to_string(),
            recursive: false,
            max_iterations: 100,
            output: root.join("results.csv"),
            jobs: 2,
        }
    }

    #[test]
    fn test_collect_mixed_jobs() {
        let tmp = TempDir::new().unwrap();
        write_job(tmp.path(), "ok", Some("TOTAL ENERGY = -8.5 Ha\nCONVERGED\n"));
        write_job(tmp.path(), "empty", None);
        fs::create_dir_all(tmp.path().join("broken")).unwrap();
        fs::write(tmp.path().join("broken").join(PLAN_FILE), "not json").unwrap();

        assert_eq!(execute(collect_args(tmp.path())).unwrap(), 0);

        let mut reader = csv::Reader::from_path(tmp.path().join("results.csv")).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);

        let by_job = |job: &str| rows.iter().find(|r| &r[0] == job).unwrap().clone();
        assert_eq!(&by_job("ok")[3], "0");
        assert_eq!(&by_job("ok")[4], "-8.5");
        assert_eq!(&by_job("empty")[3], "300");
        assert_eq!(&by_job("broken")[2], "INVALID PLAN");
    }

    #[test]
    fn test_workflow_set_with_failed_post_stage() {
        let tmp = TempDir::new().unwrap();
        let converged = "TOTAL ENERGY = -8.5 Ha\nCONVERGED\n";
        write_stage(tmp.path(), "al/scf", CalculationType::Scf, Some(converged));
        write_stage(tmp.path(), "al/dos", CalculationType::Dos, Some(converged));
        write_stage(tmp.path(), "al/bond", CalculationType::Bond, None);

        let mut args = collect_args(tmp.path());
        args.recursive = true;
        assert_eq!(execute(args).unwrap(), 0);
    }

    #[test]
    fn test_workflow_set_stops_on_scf() {
        let tmp = TempDir::new().unwrap();
        let stalled = "TOTAL ENERGY = -8.5 Ha\nNOT CONVERGED\n";
        write_stage(tmp.path(), "al/scf", CalculationType::Scf, Some(stalled));
        write_stage(tmp.path(), "al/dos", CalculationType::Dos, None);

        let mut args = collect_args(tmp.path());
        args.recursive = true;
        assert_eq!(execute(args).unwrap(), 302);
    }

    #[test]
    fn test_workflow_grouping() {
        let record = |converged: bool| {
            let mut r = ResultRecord::empty();
            r.converged = converged;
            r
        };
        let entry = |dir: &str, t: CalculationType, converged: bool| JobEntry {
            name: dir.to_string(),
            dir: PathBuf::from("/jobs").join(dir),
            calculation_type: Some(t),
            record: Ok(record(converged)),
        };
        let entries = vec![
            entry("si/scf", CalculationType::Scf, true),
            entry("si/dos", CalculationType::Dos, true),
            entry("si/extra", CalculationType::Bond, true),
            entry("lone/scf", CalculationType::Scf, false),
        ];

        let groups = group_workflows(&entries, Path::new("/jobs"));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "si");
        assert_eq!(groups[0].summary.outcome, WorkflowOutcome::Completed);
    }

    #[test]
    fn test_missing_root() {
        let tmp = TempDir::new().unwrap();
        assert!(execute(collect_args(&tmp.path().join("nope"))).is_err());
    }
}
