//! # OLCAO 计算参数数据模型
//!
//! `CalculationParameters` 只能通过 builder 构造，`build()` 时完成全部校验，
//! 因此不存在"部分有效"的参数实例。各计算类型的默认值使用穷举 `match`，
//! 新增计算类型时编译器会指出所有需要补充的分支。
//!
//! ## 依赖关系
//! - 被 `planner/`, `workflow.rs`, `commands/` 使用
//! - 使用 `error.rs`

use crate::error::{OlcaoError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

// ─────────────────────────────────────────────────────────────
// K 点网格
// ─────────────────────────────────────────────────────────────

/// K 点网格 (a, b, c)，每个分量 >= 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KPoints(pub u32, pub u32, pub u32);

impl KPoints {
    pub fn new(a: u32, b: u32, c: u32) -> Result<Self> {
        let kp = KPoints(a, b, c);
        kp.validate("kpoints")?;
        Ok(kp)
    }

    /// 从任意整数列表构造（JSON 输入），给出明确的错误信息
    pub fn from_slice(field: &str, values: &[i64]) -> Result<Self> {
        if values.len() != 3 {
            return Err(OlcaoError::validation(format!(
                "{} must have exactly 3 elements, got {}",
                field,
                values.len()
            )));
        }
        let mut mesh = [0u32; 3];
        for (slot, &v) in mesh.iter_mut().zip(values) {
            if v < 1 || v > u32::MAX as i64 {
                return Err(OlcaoError::validation(format!(
                    "{} component {} must be a positive integer",
                    field, v
                )));
            }
            *slot = v as u32;
        }
        Ok(KPoints(mesh[0], mesh[1], mesh[2]))
    }

    fn validate(&self, field: &str) -> Result<()> {
        if self.0 == 0 || self.1 == 0 || self.2 == 0 {
            return Err(OlcaoError::validation(format!(
                "{} components must be positive integers, got {}",
                field, self
            )));
        }
        Ok(())
    }

    /// 命令行参数形式 ["a", "b", "c"]
    pub fn to_args(&self) -> [String; 3] {
        [self.0.to_string(), self.1.to_string(), self.2.to_string()]
    }
}

impl Default for KPoints {
    fn default() -> Self {
        KPoints(1, 1, 1)
    }
}

impl fmt::Display for KPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.0, self.1, self.2)
    }
}

// ─────────────────────────────────────────────────────────────
// 计算类型
// ─────────────────────────────────────────────────────────────

/// uolcao 计算类型
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CalculationType {
    #[default]
    Scf,
    Dos,
    Bond,
    Sybd,
    Optc,
    Pacs,
    Field,
    Force,
    Nlop,
    Sige,
    Loen,
}

impl CalculationType {
    pub const ALL: [CalculationType; 11] = [
        CalculationType::Scf,
        CalculationType::Dos,
        CalculationType::Bond,
        CalculationType::Sybd,
        CalculationType::Optc,
        CalculationType::Pacs,
        CalculationType::Field,
        CalculationType::Force,
        CalculationType::Nlop,
        CalculationType::Sige,
        CalculationType::Loen,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CalculationType::Scf => "scf",
            CalculationType::Dos => "dos",
            CalculationType::Bond => "bond",
            CalculationType::Sybd => "sybd",
            CalculationType::Optc => "optc",
            CalculationType::Pacs => "pacs",
            CalculationType::Field => "field",
            CalculationType::Force => "force",
            CalculationType::Nlop => "nlop",
            CalculationType::Sige => "sige",
            CalculationType::Loen => "loen",
        }
    }

    pub fn is_post_scf(&self) -> bool {
        !matches!(self, CalculationType::Scf)
    }

    /// 是否支持激发态 edge（否则只能是基态 "gs"）
    pub fn accepts_edge(&self) -> bool {
        match self {
            CalculationType::Scf
            | CalculationType::Dos
            | CalculationType::Bond
            | CalculationType::Optc
            | CalculationType::Pacs
            | CalculationType::Nlop
            | CalculationType::Sige => true,
            CalculationType::Sybd
            | CalculationType::Field
            | CalculationType::Force
            | CalculationType::Loen => false,
        }
    }

    /// edge 是否必须显式给出且不能为 "gs"
    pub fn requires_edge(&self) -> bool {
        matches!(self, CalculationType::Pacs)
    }

    /// 各计算类型推荐的 post-SCF 基组
    pub fn default_pscf_basis(&self) -> Basis {
        match self {
            CalculationType::Scf => Basis::FB,
            CalculationType::Dos => Basis::FB,
            CalculationType::Bond => Basis::MB,
            CalculationType::Sybd => Basis::FB,
            CalculationType::Optc => Basis::EB,
            CalculationType::Pacs => Basis::EB,
            CalculationType::Field => Basis::FB,
            CalculationType::Force => Basis::FB,
            CalculationType::Nlop => Basis::EB,
            CalculationType::Sige => Basis::FB,
            CalculationType::Loen => Basis::MB,
        }
    }
}

impl fmt::Display for CalculationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CalculationType {
    type Err = OlcaoError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        CalculationType::ALL
            .iter()
            .copied()
            .find(|t| t.name() == lower)
            .ok_or_else(|| {
                OlcaoError::validation(format!(
                    "Invalid calculation_type '{}', expected one of: {}",
                    s,
                    CalculationType::ALL
                        .iter()
                        .map(|t| t.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

// ─────────────────────────────────────────────────────────────
// 基组
// ─────────────────────────────────────────────────────────────

/// 原子轨道基组：扩展 / 完全 / 最小 / 无（跳过 SCF）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Basis {
    EB,
    FB,
    MB,
    NO,
}

impl Basis {
    pub fn code(&self) -> &'static str {
        match self {
            Basis::EB => "EB",
            Basis::FB => "FB",
            Basis::MB => "MB",
            Basis::NO => "NO",
        }
    }

    /// 输出文件名中的小写后缀，如 gs_scf-fb.out
    pub fn file_suffix(&self) -> String {
        self.code().to_lowercase()
    }

    fn parse_field(field: &str, s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "EB" => Ok(Basis::EB),
            "FB" => Ok(Basis::FB),
            "MB" => Ok(Basis::MB),
            "NO" => Ok(Basis::NO),
            _ => Err(OlcaoError::validation(format!(
                "Invalid {} '{}', expected one of: EB, FB, MB, NO",
                field, s
            ))),
        }
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Basis {
    type Err = OlcaoError;

    fn from_str(s: &str) -> Result<Self> {
        Basis::parse_field("basis", s)
    }
}

// ─────────────────────────────────────────────────────────────
// Edge
// ─────────────────────────────────────────────────────────────

pub const GROUND_STATE_EDGE: &str = "gs";

/// 目标芯能级，"gs" 表示基态，否则形如 "1s", "2p"
///
/// 反序列化同样经过 `FromStr` 校验，手工修改的 plan.json 不能绕过。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Edge(String);

impl Edge {
    pub fn ground_state() -> Self {
        Edge(GROUND_STATE_EDGE.to_string())
    }

    pub fn is_ground_state(&self) -> bool {
        self.0 == GROUND_STATE_EDGE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Edge {
    fn default() -> Self {
        Edge::ground_state()
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Edge {
    type Err = OlcaoError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        if lower == GROUND_STATE_EDGE {
            return Ok(Edge(lower));
        }
        let bytes = lower.as_bytes();
        let well_formed = bytes.len() == 2
            && (b'1'..=b'9').contains(&bytes[0])
            && matches!(bytes[1], b's' | b'p' | b'd' | b'f');
        if well_formed {
            Ok(Edge(lower))
        } else {
            Err(OlcaoError::validation(format!(
                "Invalid edge '{}', expected 'gs' or a core level such as '1s', '2p'",
                s
            )))
        }
    }
}

impl TryFrom<String> for Edge {
    type Error = OlcaoError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

// ─────────────────────────────────────────────────────────────
// 计算参数
// ─────────────────────────────────────────────────────────────

/// 已校验的计算参数（不可变）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculationParameters {
    kpoints: KPoints,
    kpoints_scf: Option<KPoints>,
    kpoints_pscf: Option<KPoints>,
    calculation_type: CalculationType,
    basis_scf: Basis,
    basis_pscf: Basis,
    edge: Edge,
}

impl CalculationParameters {
    pub fn builder() -> CalculationParametersBuilder {
        CalculationParametersBuilder::default()
    }

    pub fn kpoints(&self) -> KPoints {
        self.kpoints
    }

    /// SCF 阶段实际使用的网格
    pub fn effective_kpoints_scf(&self) -> KPoints {
        self.kpoints_scf.unwrap_or(self.kpoints)
    }

    /// post-SCF 阶段实际使用的网格
    pub fn effective_kpoints_pscf(&self) -> KPoints {
        self.kpoints_pscf.unwrap_or(self.kpoints)
    }

    pub fn calculation_type(&self) -> CalculationType {
        self.calculation_type
    }

    pub fn basis_scf(&self) -> Basis {
        self.basis_scf
    }

    pub fn basis_pscf(&self) -> Basis {
        self.basis_pscf
    }

    pub fn edge(&self) -> &Edge {
        &self.edge
    }
}

impl Default for CalculationParameters {
    fn default() -> Self {
        CalculationParameters {
            kpoints: KPoints::default(),
            kpoints_scf: None,
            kpoints_pscf: None,
            calculation_type: CalculationType::Scf,
            basis_scf: Basis::FB,
            basis_pscf: CalculationType::Scf.default_pscf_basis(),
            edge: Edge::ground_state(),
        }
    }
}

/// `CalculationParameters` 的构造器，未设置的字段在 `build()` 时按计算类型取默认值
#[derive(Debug, Clone, Default)]
pub struct CalculationParametersBuilder {
    kpoints: Option<KPoints>,
    kpoints_scf: Option<KPoints>,
    kpoints_pscf: Option<KPoints>,
    calculation_type: Option<CalculationType>,
    basis_scf: Option<Basis>,
    basis_pscf: Option<Basis>,
    edge: Option<Edge>,
}

impl CalculationParametersBuilder {
    pub fn kpoints(mut self, kpoints: KPoints) -> Self {
        self.kpoints = Some(kpoints);
        self
    }

    pub fn kpoints_scf(mut self, kpoints: KPoints) -> Self {
        self.kpoints_scf = Some(kpoints);
        self
    }

    pub fn kpoints_pscf(mut self, kpoints: KPoints) -> Self {
        self.kpoints_pscf = Some(kpoints);
        self
    }

    pub fn calculation_type(mut self, calculation_type: CalculationType) -> Self {
        self.calculation_type = Some(calculation_type);
        self
    }

    pub fn basis_scf(mut self, basis: Basis) -> Self {
        self.basis_scf = Some(basis);
        self
    }

    pub fn basis_pscf(mut self, basis: Basis) -> Self {
        self.basis_pscf = Some(basis);
        self
    }

    pub fn edge(mut self, edge: Edge) -> Self {
        self.edge = Some(edge);
        self
    }

    /// 校验并生成参数；任何非法组合都在这里被拒绝
    pub fn build(self) -> Result<CalculationParameters> {
        let kpoints = self.kpoints.unwrap_or_default();
        kpoints.validate("kpoints")?;
        if let Some(kp) = &self.kpoints_scf {
            kp.validate("kpoints_scf")?;
        }
        if let Some(kp) = &self.kpoints_pscf {
            kp.validate("kpoints_pscf")?;
        }

        let calculation_type = self.calculation_type.unwrap_or_default();
        let edge = self.edge.unwrap_or_default();

        if calculation_type.requires_edge() && edge.is_ground_state() {
            return Err(OlcaoError::validation(format!(
                "calculation_type '{}' requires an explicit core-level edge (not '{}')",
                calculation_type, GROUND_STATE_EDGE
            )));
        }
        if !calculation_type.accepts_edge() && !edge.is_ground_state() {
            return Err(OlcaoError::validation(format!(
                "calculation_type '{}' is ground-state only, edge '{}' is not allowed",
                calculation_type, edge
            )));
        }

        let basis_scf = self.basis_scf.unwrap_or(Basis::FB);
        let basis_pscf = self
            .basis_pscf
            .unwrap_or_else(|| calculation_type.default_pscf_basis());

        if basis_scf == Basis::NO {
            if !calculation_type.is_post_scf() {
                return Err(OlcaoError::validation(
                    "basis_scf 'NO' skips the SCF stage and cannot be used with calculation_type 'scf'",
                ));
            }
            warn!(
                calculation_type = %calculation_type,
                "basis_scf 'NO' reuses an existing SCF checkpoint; its presence is not verified"
            );
        }
        if basis_pscf == Basis::NO && calculation_type.is_post_scf() {
            return Err(OlcaoError::validation(format!(
                "basis_pscf 'NO' is not valid for post-SCF calculation_type '{}'",
                calculation_type
            )));
        }

        Ok(CalculationParameters {
            kpoints,
            kpoints_scf: self.kpoints_scf,
            kpoints_pscf: self.kpoints_pscf,
            calculation_type,
            basis_scf,
            basis_pscf,
            edge,
        })
    }
}

// ─────────────────────────────────────────────────────────────
// JSON 参数文件
// ─────────────────────────────────────────────────────────────

/// 参数文件的原始形状，如
/// `{"kpoints": [5, 5, 5], "calculation_type": "dos", "basis_scf": "FB"}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kpoints: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kpoints_scf: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kpoints_pscf: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basis_scf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basis_pscf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<String>,
}

impl ParameterSet {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// 转换为 builder（只做逐字段的类型转换，组合校验留给 `build()`）
    pub fn into_builder(self) -> Result<CalculationParametersBuilder> {
        let mut builder = CalculationParameters::builder();
        if let Some(kp) = self.kpoints {
            builder = builder.kpoints(KPoints::from_slice("kpoints", &kp)?);
        }
        if let Some(kp) = self.kpoints_scf {
            builder = builder.kpoints_scf(KPoints::from_slice("kpoints_scf", &kp)?);
        }
        if let Some(kp) = self.kpoints_pscf {
            builder = builder.kpoints_pscf(KPoints::from_slice("kpoints_pscf", &kp)?);
        }
        if let Some(t) = self.calculation_type {
            builder = builder.calculation_type(t.parse()?);
        }
        if let Some(b) = self.basis_scf {
            builder = builder.basis_scf(Basis::parse_field("basis_scf", &b)?);
        }
        if let Some(b) = self.basis_pscf {
            builder = builder.basis_pscf(Basis::parse_field("basis_pscf", &b)?);
        }
        if let Some(e) = self.edge {
            builder = builder.edge(e.parse()?);
        }
        Ok(builder)
    }

    pub fn into_parameters(self) -> Result<CalculationParameters> {
        self.into_builder()?.build()
    }
}
