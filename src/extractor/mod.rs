//! # 结果提取器
//!
//! 读取取回目录，按 `JobPlan` 定位输出文件，生成 `ResultRecord`。
//!
//! 判定顺序：
//! 1. 目录不存在或为空 → `NoRetrievedFolder`
//! 2. 没有任何必有文件 → `MissingOutputFile`
//! 3. 没有 `olcao.dat` 也没有 `inputs/` → `PreprocessFailed`
//! 4. 解析 SCF 输出、阶段输出和 `summary`，发现报错标记 → `ScfFailed`
//! 5. 收敛判断
//!
//! 提取从不返回 `Err`，所有失败都体现在记录里。
//!
//! ## 依赖关系
//! - 被 `workflow.rs`, `commands/extract.rs`, `commands/collect.rs` 使用
//! - 使用 `parsers/olcao_out.rs`, `models/`
//! - 使用 `walkdir` 遍历目录，`glob` 匹配输出模式

use crate::models::plan::PREPROCESS_MARKER_DIR;
use crate::models::result::DEFAULT_ENERGY_UNITS;
use crate::models::{FailureKind, JobPlan, OutputPattern, OutputRole, ResultRecord};
use crate::parsers::olcao_out::{parse_output_file, OutputFields};
use glob::{MatchOptions, Pattern};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// 提取选项
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// SCF 最大迭代次数；没有显式收敛标记时，用迭代次数是否达到上限判断收敛
    pub max_iterations: u32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    options: ExtractOptions,
}

/// 使用默认选项提取
pub fn extract(dir: &Path, plan: &JobPlan) -> ResultRecord {
    Extractor::default().extract(dir, plan)
}

impl Extractor {
    pub fn new(options: ExtractOptions) -> Self {
        Extractor { options }
    }

    pub fn extract(&self, dir: &Path, plan: &JobPlan) -> ResultRecord {
        if !dir.is_dir() {
            return fail(
                ResultRecord::failed(FailureKind::NoRetrievedFolder),
                format!("retrieved folder '{}' does not exist", dir.display()),
            );
        }

        let files = list_files(dir);
        if files.is_empty() {
            return fail(
                ResultRecord::failed(FailureKind::NoRetrievedFolder),
                format!("retrieved folder '{}' is empty", dir.display()),
            );
        }

        let mut record = ResultRecord::empty();
        record.retrieved_files = files;

        let has_outputs = plan
            .always_present_patterns()
            .any(|p| !matching(p, &record.retrieved_files).is_empty());
        if !has_outputs {
            record.mark_failed(FailureKind::MissingOutputFile);
            return fail(record, "none of the expected OLCAO output files were retrieved");
        }

        let has_marker = plan
            .patterns(OutputRole::PreprocessMarker)
            .any(|p| !matching(p, &record.retrieved_files).is_empty())
            || dir.join(PREPROCESS_MARKER_DIR).is_dir();
        if !has_marker {
            record.mark_failed(FailureKind::PreprocessFailed);
            return fail(record, "makeinput left neither olcao.dat nor inputs/ behind");
        }

        let Some((primary, mut fields)) = self.parse_primary(dir, plan, &mut record) else {
            record.mark_failed(FailureKind::MissingOutputFile);
            return fail(
                record,
                format!("no readable main output (expected '{}')", plan.primary_output_name()),
            );
        };
        record.output_file = Some(primary);

        for secondary in plan.stage_output_name().into_iter().chain(["summary".to_string()]) {
            if !record.retrieved_files.contains(&secondary) {
                if secondary != "summary" {
                    note(&mut record, format!("stage output '{}' was not retrieved", secondary));
                }
                continue;
            }
            match parse_output_file(&dir.join(&secondary)) {
                Ok(other) => fields.fill_missing(other),
                Err(e) => note(&mut record, format!("could not read '{}': {}", secondary, e)),
            }
        }

        self.collect_property_files(plan, &mut record);
        self.apply_fields(fields, &mut record);

        debug!(
            dir = %dir.display(),
            exit_code = record.exit_code(),
            "extracted {}",
            record.outcome_label()
        );
        record
    }

    /// 先找计划中的 SCF 输出名，找不到时退回到第一个匹配主输出模式的文件
    fn parse_primary(
        &self,
        dir: &Path,
        plan: &JobPlan,
        record: &mut ResultRecord,
    ) -> Option<(String, OutputFields)> {
        let expected = plan.primary_output_name();
        let mut candidates: Vec<String> = Vec::new();
        if record.retrieved_files.contains(&expected) {
            candidates.push(expected.clone());
        }
        for pattern in plan.patterns(OutputRole::MainOutput) {
            for name in matching(pattern, &record.retrieved_files) {
                if !candidates.contains(&name) {
                    candidates.push(name);
                }
            }
        }

        for name in candidates {
            match parse_output_file(&dir.join(&name)) {
                Ok(fields) => {
                    if name != expected {
                        note(
                            record,
                            format!("'{}' not found, parsed '{}' instead", expected, name),
                        );
                    }
                    return Some((name, fields));
                }
                Err(e) => note(record, format!("could not read '{}': {}", name, e)),
            }
        }
        None
    }

    fn collect_property_files(&self, plan: &JobPlan, record: &mut ResultRecord) {
        let mut missing = Vec::new();
        for pattern in plan.patterns(OutputRole::Property) {
            let found = matching(pattern, &record.retrieved_files);
            if found.is_empty() {
                missing.push(pattern.glob.clone());
            }
            record.property_files.extend(found);
        }
        for glob in missing {
            note(record, format!("expected output '{}' was not retrieved", glob));
        }
    }

    fn apply_fields(&self, fields: OutputFields, record: &mut ResultRecord) {
        record.energy_units = fields
            .total_energy
            .as_ref()
            .and_then(|q| q.units.clone())
            .or_else(|| fields.fermi_energy.as_ref().and_then(|q| q.units.clone()))
            .unwrap_or_else(|| DEFAULT_ENERGY_UNITS.to_string());
        record.total_energy = fields.total_energy;
        record.fermi_energy = fields.fermi_energy;
        record.band_gap = fields.band_gap;
        record.num_atoms = fields.num_atoms;
        record.num_electrons = fields.num_electrons;
        record.num_iterations = fields.num_iterations;

        if let Some(error) = fields.error {
            record.mark_failed(FailureKind::ScfFailed);
            record.error_message = Some(error);
            return;
        }

        record.converged = match (fields.convergence, record.num_iterations) {
            (Some(flag), _) => flag,
            (None, Some(n)) => n < self.options.max_iterations,
            (None, None) => {
                note(
                    record,
                    "no convergence marker or iteration count found, treating as not converged",
                );
                false
            }
        };
    }
}

/// 目录下全部文件的相对路径（排序）
fn list_files(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            e.path()
                .strip_prefix(dir)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    files.sort();
    files
}

/// 匹配某个模式的文件；`*` 不跨越目录
fn matching(pattern: &OutputPattern, files: &[String]) -> Vec<String> {
    let Ok(glob) = Pattern::new(&pattern.glob) else {
        warn!(glob = %pattern.glob, "invalid output pattern");
        return Vec::new();
    };
    let options = MatchOptions {
        require_literal_separator: true,
        ..MatchOptions::new()
    };
    files
        .iter()
        .filter(|f| glob.matches_with(f, options))
        .cloned()
        .collect()
}

fn note(record: &mut ResultRecord, msg: impl Into<String>) {
    let msg = msg.into();
    warn!("{}", msg);
    record.warnings.push(msg);
}

fn fail(mut record: ResultRecord, msg: impl Into<String>) -> ResultRecord {
    let msg = msg.into();
    debug!(failure = ?record.failure_kind, "{}", msg);
    record.error_message = Some(msg);
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Atom, CalculationParameters, CalculationType, CellMode, Lattice, Status,
        StructureDescriptor,
    };
    use crate::planner;
    use std::fs;
    use tempfile::TempDir;

    fn structure() -> StructureDescriptor {
        StructureDescriptor {
            title: "Si".to_string(),
            lattice: Lattice::from_parameters(5.43, 5.43, 5.43, 90.0, 90.0, 90.0),
            atoms: vec![Atom::new("Si", [0.0, 0.0, 0.0]), Atom::new("Si", [0.25, 0.25, 0.25])],
            space_group: "227_a".to_string(),
            supercell: [1, 1, 1],
            cell_mode: CellMode::Full,
        }
    }

    fn plan_for(calculation_type: CalculationType) -> JobPlan {
        let params = CalculationParameters::builder()
            .calculation_type(calculation_type)
            .build()
            .unwrap();
        planner::plan(&params, &structure()).unwrap()
    }

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// 预处理成功、SCF 输出给定内容的目录
    fn retrieved(scf_output: &str) -> TempDir {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "olcao.dat", "");
        write(tmp.path(), "summary", "");
        write(tmp.path(), "gs_scf-fb.out", scf_output);
        tmp
    }

    #[test]
    fn test_missing_folder() {
        let tmp = TempDir::new().unwrap();
        let record = extract(&tmp.path().join("nope"), &plan_for(CalculationType::Scf));
        assert_eq!(record.failure_kind, Some(FailureKind::NoRetrievedFolder));
        assert_eq!(record.exit_code(), 300);
    }

    #[test]
    fn test_empty_folder() {
        let tmp = TempDir::new().unwrap();
        let record = extract(tmp.path(), &plan_for(CalculationType::Scf));
        assert_eq!(record.exit_code(), 300);
    }

    #[test]
    fn test_no_expected_outputs() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "olcao.dat", "");
        write(tmp.path(), "slurm-123.out", "");
        let record = extract(tmp.path(), &plan_for(CalculationType::Scf));
        assert_eq!(record.failure_kind, Some(FailureKind::MissingOutputFile));
        assert_eq!(record.exit_code(), 301);
        assert_eq!(record.retrieved_files, vec!["olcao.dat", "slurm-123.out"]);
    }

    #[test]
    fn test_preprocess_failed() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "summary", "");
        write(tmp.path(), "gs_scf-fb.out", "TOTAL ENERGY = -1.0\n");
        let record = extract(tmp.path(), &plan_for(CalculationType::Scf));
        assert_eq!(record.failure_kind, Some(FailureKind::PreprocessFailed));
        assert_eq!(record.exit_code(), 310);
    }

    #[test]
    fn test_inputs_directory_counts_as_marker() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "inputs/structure.dat", "");
        write(tmp.path(), "gs_scf-fb.out", "TOTAL ENERGY = -1.0\nSCF CONVERGED\n");
        let record = extract(tmp.path(), &plan_for(CalculationType::Scf));
        assert!(record.is_ok());
        assert!(record.converged);
    }

    #[test]
    fn test_successful_scf() {
        let tmp = retrieved(
            "    ITERATION 1\n    ITERATION 2\nTOTAL ENERGY -45.768046 Ha\nFERMI ENERGY 0.234567 Ha\nSCF CONVERGED\n",
        );
        let record = extract(tmp.path(), &plan_for(CalculationType::Scf));

        assert_eq!(record.status, Status::Ok);
        assert_eq!(record.total_energy_value(), Some(-45.768046));
        assert_eq!(record.fermi_energy_value(), Some(0.234567));
        assert_eq!(record.energy_units, "Ha");
        assert_eq!(record.num_iterations, Some(2));
        assert!(record.converged);
        assert_eq!(record.exit_code(), 0);
        assert_eq!(record.output_file.as_deref(), Some("gs_scf-fb.out"));
    }

    #[test]
    fn test_default_units_when_none_printed() {
        let tmp = retrieved("TOTAL ENERGY = -3.5\nCONVERGED\n");
        let record = extract(tmp.path(), &plan_for(CalculationType::Scf));
        assert_eq!(record.energy_units, "Hartree");
    }

    #[test]
    fn test_solver_error_keeps_fields() {
        let tmp = retrieved("TOTAL ENERGY = -10.0\nERROR: matrix not positive definite\nin routine cholesky\n\ntrailer\n");
        let record = extract(tmp.path(), &plan_for(CalculationType::Scf));

        assert_eq!(record.failure_kind, Some(FailureKind::ScfFailed));
        assert_eq!(record.exit_code(), 303);
        assert_eq!(record.total_energy_value(), Some(-10.0));
        let msg = record.error_message.unwrap();
        assert!(msg.starts_with("ERROR: matrix not positive definite"));
        assert!(!msg.contains("trailer"));
    }

    #[test]
    fn test_not_converged_is_ok_status() {
        let tmp = retrieved("TOTAL ENERGY = -1.0\nSCF NOT CONVERGED\n");
        let record = extract(tmp.path(), &plan_for(CalculationType::Scf));
        assert!(record.is_ok());
        assert!(record.is_not_converged());
        assert_eq!(record.exit_code(), 302);
    }

    #[test]
    fn test_convergence_from_iteration_count() {
        let tmp = retrieved("ITERATION 1\nITERATION 12\nTOTAL ENERGY = -1.0\n");
        let plan = plan_for(CalculationType::Scf);

        let record = extract(tmp.path(), &plan);
        assert!(record.converged);

        let strict = Extractor::new(ExtractOptions { max_iterations: 12 });
        assert!(!strict.extract(tmp.path(), &plan).converged);
    }

    #[test]
    fn test_no_convergence_evidence() {
        let tmp = retrieved("TOTAL ENERGY = -1.0\n");
        let record = extract(tmp.path(), &plan_for(CalculationType::Scf));
        assert!(!record.converged);
        assert!(record.warnings.iter().any(|w| w.contains("convergence")));
    }

    #[test]
    fn test_fallback_main_output() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "olcao.dat", "");
        write(tmp.path(), "gs_scf-mb.out", "TOTAL ENERGY = -2.0\nCONVERGED\n");
        let record = extract(tmp.path(), &plan_for(CalculationType::Scf));

        assert!(record.is_ok());
        assert_eq!(record.output_file.as_deref(), Some("gs_scf-mb.out"));
        assert!(record.warnings.iter().any(|w| w.contains("gs_scf-fb.out")));
    }

    #[test]
    fn test_dos_stage_and_summary_fill_fields() {
        let tmp = retrieved("TOTAL ENERGY = -7.25 (eV)\nSCF CONVERGED\n");
        write(tmp.path(), "gs_dos-fb.out", "BAND GAP = 1.1 eV\n");
        write(tmp.path(), "summary", "FERMI ENERGY = -0.1 eV\nNUMBER OF ATOMS = 2\n");
        write(tmp.path(), "gs_dos-fb.t.plot", "ENERGY TOTAL\n0.0 1.0\n");
        let record = extract(tmp.path(), &plan_for(CalculationType::Dos));

        assert!(record.is_ok());
        assert_eq!(record.energy_units, "eV");
        assert_eq!(record.band_gap.as_ref().map(|q| q.value), Some(1.1));
        assert_eq!(record.fermi_energy_value(), Some(-0.1));
        assert_eq!(record.num_atoms, Some(2));
        assert_eq!(record.property_files, vec!["gs_dos-fb.t.plot"]);
        assert!(record.warnings.iter().any(|w| w.contains("gs_dos-fb.p.raw")));
    }

    #[test]
    fn test_dos_job_end_to_end() {
        let params = crate::models::ParameterSet::from_json(
            r#"{"kpoints": [5, 5, 5], "calculation_type": "dos",
                "basis_scf": "FB", "basis_pscf": "FB", "edge": "gs"}"#,
        )
        .unwrap()
        .into_parameters()
        .unwrap();
        let plan = planner::plan(&params, &structure()).unwrap();

        assert_eq!(plan.preprocessor_args(), ["-kp", "5", "5", "5"]);
        assert_eq!(plan.solver_args(), ["-dos", "FB"]);
        let property_globs: Vec<&str> = plan
            .patterns(OutputRole::Property)
            .map(|p| p.glob.as_str())
            .collect();
        assert!(property_globs.contains(&"gs_dos-fb.t.plot"));
        assert!(property_globs.contains(&"gs_dos-fb.p.raw"));

        let tmp = retrieved(
            "TOTAL ENERGY -45.768046 Ha\nFERMI ENERGY 0.234567 Ha\nSCF CONVERGED\n",
        );
        write(tmp.path(), "gs_dos-fb.out", "");
        write(tmp.path(), "gs_dos-fb.t.plot", "0.0 1.0\n");
        write(tmp.path(), "gs_dos-fb.p.raw", "");
        let record = extract(tmp.path(), &plan);

        assert_eq!(record.status, Status::Ok);
        assert_eq!(record.total_energy_value(), Some(-45.768046));
        assert_eq!(record.fermi_energy_value(), Some(0.234567));
        assert_eq!(record.energy_units, "Ha");
        assert!(record.converged);
        assert_eq!(record.exit_code(), 0);
        let mut property_files = record.property_files.clone();
        property_files.sort();
        assert_eq!(property_files, vec!["gs_dos-fb.p.raw", "gs_dos-fb.t.plot"]);
    }

    #[test]
    fn test_dos_job_without_property_files() {
        let tmp = retrieved("TOTAL ENERGY = -1.0 Ha\nSCF CONVERGED\n");
        let record = extract(tmp.path(), &plan_for(CalculationType::Dos));

        assert_eq!(record.status, Status::Ok);
        assert!(record.property_files.is_empty());
        assert!(record.band_gap.is_none());
        assert_eq!(record.exit_code(), 0);
    }
}
