//! # 作业计划 (JobPlan) 数据模型
//!
//! 由 `planner::plan` 生成，描述远程执行所需的全部确定性信息：
//! 暂存输入文件名、makeinput / uolcao 参数、需要取回的输出文件模式。
//!
//! ## 依赖关系
//! - 被 `planner/`, `extractor/`, `utils/slurm.rs`, `commands/` 使用
//! - 使用 `models/params.rs`

use crate::error::{OlcaoError, Result};
use crate::models::params::{Basis, CalculationType, Edge};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

/// makeinput 只认这个文件名，无论用户提供的骨架文件叫什么
pub const STAGED_INPUT_NAME: &str = "olcao.skl";

/// 中间文件/检查点目录的环境变量，指向作业自身的工作目录
pub const SCRATCH_ENV_VAR: &str = "OLCAO_TEMP";
pub const SCRATCH_ENV_VALUE: &str = "$PWD";

/// makeinput 成功后生成的文件；同时生成的 `inputs/` 目录也视为标记
pub const PREPROCESS_MARKER_FILE: &str = "olcao.dat";
pub const PREPROCESS_MARKER_DIR: &str = "inputs";

/// 输出文件在结果提取中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputRole {
    MainOutput,
    EnergyTrace,
    IterationTrace,
    Summary,
    Timing,
    PreprocessMarker,
    Property,
    Checkpoint,
}

impl OutputRole {
    /// 每次运行都应产生的文件
    pub fn is_always_present(&self) -> bool {
        matches!(
            self,
            OutputRole::MainOutput
                | OutputRole::EnergyTrace
                | OutputRole::IterationTrace
                | OutputRole::Summary
                | OutputRole::Timing
        )
    }
}

/// 一个需要取回的输出文件 glob 模式
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutputPattern {
    pub glob: String,
    pub role: OutputRole,
}

impl OutputPattern {
    pub fn new(glob: impl Into<String>, role: OutputRole) -> Self {
        OutputPattern {
            glob: glob.into(),
            role,
        }
    }
}

/// 作业计划
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPlan {
    staged_input_name: String,
    preprocessor_args: Vec<String>,
    solver_args: Vec<String>,
    expected_outputs: BTreeSet<OutputPattern>,
    calculation_type: CalculationType,
    edge: Edge,
    basis_scf: Basis,
    basis_pscf: Basis,
}

impl JobPlan {
    pub(crate) fn new(
        preprocessor_args: Vec<String>,
        solver_args: Vec<String>,
        expected_outputs: BTreeSet<OutputPattern>,
        calculation_type: CalculationType,
        edge: Edge,
        basis_scf: Basis,
        basis_pscf: Basis,
    ) -> Self {
        JobPlan {
            staged_input_name: STAGED_INPUT_NAME.to_string(),
            preprocessor_args,
            solver_args,
            expected_outputs,
            calculation_type,
            edge,
            basis_scf,
            basis_pscf,
        }
    }

    pub fn staged_input_name(&self) -> &str {
        &self.staged_input_name
    }

    pub fn preprocessor_args(&self) -> &[String] {
        &self.preprocessor_args
    }

    pub fn solver_args(&self) -> &[String] {
        &self.solver_args
    }

    pub fn expected_outputs(&self) -> &BTreeSet<OutputPattern> {
        &self.expected_outputs
    }

    pub fn calculation_type(&self) -> CalculationType {
        self.calculation_type
    }

    pub fn edge(&self) -> &Edge {
        &self.edge
    }

    pub fn basis_scf(&self) -> Basis {
        self.basis_scf
    }

    pub fn basis_pscf(&self) -> Basis {
        self.basis_pscf
    }

    /// 指定角色的全部模式
    pub fn patterns(&self, role: OutputRole) -> impl Iterator<Item = &OutputPattern> {
        self.expected_outputs.iter().filter(move |p| p.role == role)
    }

    pub fn always_present_patterns(&self) -> impl Iterator<Item = &OutputPattern> {
        self.expected_outputs
            .iter()
            .filter(|p| p.role.is_always_present())
    }

    /// `<edge>_<stage>-<basis>.out`
    fn output_name(&self, stage: &str, basis: Basis) -> String {
        format!("{}_{}-{}.out", self.edge, stage, basis.file_suffix())
    }

    /// SCF 阶段主输出，总能量、费米能和收敛信息都在这里
    pub fn scf_output_name(&self) -> String {
        self.output_name(CalculationType::Scf.name(), self.basis_scf)
    }

    /// post-SCF 阶段的输出；scf 计算没有单独的阶段文件
    pub fn stage_output_name(&self) -> Option<String> {
        if self.calculation_type.is_post_scf() {
            Some(self.output_name(self.calculation_type.name(), self.basis_pscf))
        } else {
            None
        }
    }

    /// 结果提取时首先解析的文件
    pub fn primary_output_name(&self) -> String {
        self.scf_output_name()
    }

    /// 暂存目录环境变量覆盖
    pub fn scratch_env(&self) -> (&'static str, &'static str) {
        (SCRATCH_ENV_VAR, SCRATCH_ENV_VALUE)
    }

    /// 追加可选的检查点文件（体积大，默认不取回）
    pub fn with_checkpoint_retrieval(mut self) -> Self {
        self.expected_outputs.insert(OutputPattern::new(
            format!("{}_*-*.hdf5", self.edge),
            OutputRole::Checkpoint,
        ));
        self
    }

    /// 取回列表：计划中的模式在前，额外条目在后，去重并保持顺序
    pub fn retrieve_list(&self, extra: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        self.expected_outputs
            .iter()
            .map(|p| p.glob.clone())
            .chain(extra.iter().cloned())
            .filter(|g| seen.insert(g.clone()))
            .collect()
    }

    /// 完整的 makeinput 命令行
    pub fn preprocessor_command(&self, executable: &str) -> String {
        join_command(executable, &self.preprocessor_args)
    }

    /// 完整的 uolcao 命令行
    pub fn solver_command(&self, executable: &str) -> String {
        join_command(executable, &self.solver_args)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| OlcaoError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        JobPlan::from_json(&content).map_err(|e| OlcaoError::ParseError {
            format: "plan".to_string(),
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

fn join_command(executable: &str, args: &[String]) -> String {
    std::iter::once(executable)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
