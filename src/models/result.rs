//! # 计算结果数据模型
//!
//! `ResultRecord` 是结果提取的唯一产物。提取失败也以 `status = Failed`
//! 的记录表示，而不是返回错误，这样批量提取时每个作业的结果都可独立观察。
//!
//! ## 依赖关系
//! - 被 `extractor/`, `workflow.rs`, `commands/` 使用
//! - 无外部模块依赖

use serde::{Deserialize, Serialize};
use std::fmt;

/// OLCAO 输出未标注单位时使用的原生能量单位
pub const DEFAULT_ENERGY_UNITS: &str = "Hartree";

/// 带单位的数值，单位保持输出文件中的原样
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub units: Option<String>,
}

impl Quantity {
    pub fn new(value: f64, units: Option<String>) -> Self {
        Quantity { value, units }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.units {
            Some(u) => write!(f, "{} {}", self.value, u),
            None => write!(f, "{}", self.value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Failed,
}

/// 提取阶段的失败分类，每种对应一个退出码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    NoRetrievedFolder,
    MissingOutputFile,
    PreprocessFailed,
    ScfFailed,
}

impl FailureKind {
    pub fn exit_code(&self) -> i32 {
        match self {
            FailureKind::NoRetrievedFolder => exit_codes::NO_RETRIEVED_FOLDER,
            FailureKind::MissingOutputFile => exit_codes::MISSING_OUTPUT_FILE,
            FailureKind::ScfFailed => exit_codes::SCF_FAILED,
            FailureKind::PreprocessFailed => exit_codes::PREPROCESS_FAILED,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FailureKind::NoRetrievedFolder => "no retrieved folder",
            FailureKind::MissingOutputFile => "missing output file",
            FailureKind::PreprocessFailed => "makeinput preprocessing failed",
            FailureKind::ScfFailed => "SCF failed",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// 返回给调度方的退出码
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const NO_RETRIEVED_FOLDER: i32 = 300;
    pub const MISSING_OUTPUT_FILE: i32 = 301;
    pub const NOT_CONVERGED: i32 = 302;
    pub const SCF_FAILED: i32 = 303;
    pub const PREPROCESS_FAILED: i32 = 310;
}

/// 结果记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub status: Status,
    pub failure_kind: Option<FailureKind>,

    pub total_energy: Option<Quantity>,
    pub energy_units: String,
    pub fermi_energy: Option<Quantity>,
    pub band_gap: Option<Quantity>,
    pub num_atoms: Option<u32>,
    pub num_electrons: Option<f64>,
    pub num_iterations: Option<u32>,
    pub converged: bool,

    /// 求解器报错的上下文（截断）
    pub error_message: Option<String>,

    /// 实际解析的主输出文件
    pub output_file: Option<String>,

    /// 取回目录中的全部文件（相对路径，已排序）
    pub retrieved_files: Vec<String>,

    /// 找到的计算类型专属文件
    pub property_files: Vec<String>,

    pub warnings: Vec<String>,
}

impl ResultRecord {
    pub fn empty() -> Self {
        ResultRecord {
            status: Status::Ok,
            failure_kind: None,
            total_energy: None,
            energy_units: DEFAULT_ENERGY_UNITS.to_string(),
            fermi_energy: None,
            band_gap: None,
            num_atoms: None,
            num_electrons: None,
            num_iterations: None,
            converged: false,
            error_message: None,
            output_file: None,
            retrieved_files: Vec::new(),
            property_files: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// 直接失败（未进入解析）的记录
    pub fn failed(kind: FailureKind) -> Self {
        let mut record = ResultRecord::empty();
        record.mark_failed(kind);
        record
    }

    pub fn mark_failed(&mut self, kind: FailureKind) {
        self.status = Status::Failed;
        self.failure_kind = Some(kind);
        self.converged = false;
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// 状态 ok 但未收敛：合法的物理结果，不应重试
    pub fn is_not_converged(&self) -> bool {
        self.is_ok() && !self.converged
    }

    pub fn exit_code(&self) -> i32 {
        match self.failure_kind {
            Some(kind) => kind.exit_code(),
            None if !self.converged => exit_codes::NOT_CONVERGED,
            None => exit_codes::SUCCESS,
        }
    }

    /// 简短的状态描述，用于表格输出
    pub fn outcome_label(&self) -> String {
        match self.failure_kind {
            Some(kind) => format!("FAILED ({})", kind),
            None if !self.converged => "NOT CONVERGED".to_string(),
            None => "OK".to_string(),
        }
    }

    pub fn total_energy_value(&self) -> Option<f64> {
        self.total_energy.as_ref().map(|q| q.value)
    }

    pub fn fermi_energy_value(&self) -> Option<f64> {
        self.fermi_energy.as_ref().map(|q| q.value)
    }
}
