//! # 共享 CLI 参数组
//!
//! 计算参数、OLCAO 环境和 Slurm 资源在多个子命令间共用，
//! 以 `#[command(flatten)]` 的方式嵌入。
//!
//! ## 依赖关系
//! - 被 `cli/plan.rs`, `cli/prepare.rs` 使用
//! - 转换为 `models::CalculationParametersBuilder`, `utils::slurm` 配置

use crate::error::{OlcaoError, Result};
use crate::models::{CalculationParameters, CalculationParametersBuilder, ParameterSet};
use crate::utils::slurm::{OlcaoEnvironment, SlurmConfig};
use clap::Args;
use std::fs;
use std::path::PathBuf;

/// 计算参数：JSON 文件和/或命令行，命令行优先
#[derive(Args, Debug, Clone, Default)]
pub struct ParamArgs {
    /// JSON parameter file, e.g. {"kpoints": [5,5,5], "calculation_type": "dos"}
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// K-point mesh shared by both stages (e.g. '5,5,5')
    #[arg(long, value_delimiter = ',')]
    pub kpoints: Option<Vec<i64>>,

    /// K-point mesh for the SCF stage only
    #[arg(long, value_delimiter = ',')]
    pub kpoints_scf: Option<Vec<i64>>,

    /// K-point mesh for the post-SCF stage only
    #[arg(long, value_delimiter = ',')]
    pub kpoints_pscf: Option<Vec<i64>>,

    /// Calculation type (scf, dos, bond, sybd, optc, pacs, field, force, nlop, sige, loen)
    #[arg(long = "type")]
    pub calculation_type: Option<String>,

    /// Basis for the SCF stage (EB, FB, MB, NO)
    #[arg(long)]
    pub basis_scf: Option<String>,

    /// Basis for the post-SCF stage (default depends on the calculation type)
    #[arg(long)]
    pub basis_pscf: Option<String>,

    /// Core-level edge ('gs' or e.g. '1s', '2p')
    #[arg(long)]
    pub edge: Option<String>,
}

impl ParamArgs {
    /// 合并 JSON 文件与命令行参数
    pub fn to_parameter_set(&self) -> Result<ParameterSet> {
        let mut set = match &self.params {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| OlcaoError::FileReadError {
                    path: path.display().to_string(),
                    source: e,
                })?;
                ParameterSet::from_json(&text).map_err(|e| OlcaoError::ParseError {
                    format: "parameters".to_string(),
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?
            }
            None => ParameterSet::default(),
        };

        if self.kpoints.is_some() {
            set.kpoints = self.kpoints.clone();
        }
        if self.kpoints_scf.is_some() {
            set.kpoints_scf = self.kpoints_scf.clone();
        }
        if self.kpoints_pscf.is_some() {
            set.kpoints_pscf = self.kpoints_pscf.clone();
        }
        if self.calculation_type.is_some() {
            set.calculation_type = self.calculation_type.clone();
        }
        if self.basis_scf.is_some() {
            set.basis_scf = self.basis_scf.clone();
        }
        if self.basis_pscf.is_some() {
            set.basis_pscf = self.basis_pscf.clone();
        }
        if self.edge.is_some() {
            set.edge = self.edge.clone();
        }
        Ok(set)
    }

    pub fn to_builder(&self) -> Result<CalculationParametersBuilder> {
        self.to_parameter_set()?.into_builder()
    }

    pub fn to_parameters(&self) -> Result<CalculationParameters> {
        self.to_parameter_set()?.into_parameters()
    }
}

/// OLCAO 环境路径，可由环境变量提供
#[derive(Args, Debug, Clone)]
pub struct OlcaoEnvArgs {
    /// OLCAO rc file sourced by the job script (expanded on the compute node)
    #[arg(long, env = "OLCAO_RC", default_value = "$HOME/.olcao/olcaorc")]
    pub olcao_rc: String,

    /// makeinput executable
    #[arg(long, env = "OLCAO_MAKEINPUT", default_value = "makeinput")]
    pub makeinput: String,

    /// uolcao executable
    #[arg(long, env = "OLCAO_UOLCAO", default_value = "uolcao")]
    pub uolcao: String,
}

impl OlcaoEnvArgs {
    pub fn to_environment(&self) -> OlcaoEnvironment {
        OlcaoEnvironment {
            rc_file: self.olcao_rc.clone(),
            makeinput: self.makeinput.clone(),
            uolcao: self.uolcao.clone(),
        }
    }
}

/// Slurm 资源
#[derive(Args, Debug, Clone)]
pub struct SlurmArgs {
    /// Slurm partition
    #[arg(long)]
    pub partition: Option<String>,

    /// Slurm constraint
    #[arg(long)]
    pub constraint: Option<String>,

    /// Number of nodes
    #[arg(long, default_value_t = 1)]
    pub nodes: u32,

    /// Number of tasks
    #[arg(long, default_value_t = 1)]
    pub ntasks: u32,

    /// CPUs per task
    #[arg(long, default_value_t = 1)]
    pub cpus_per_task: u32,

    /// Memory per CPU
    #[arg(long, default_value = "4G")]
    pub mem_per_cpu: String,

    /// Time limit (e.g., '24:00:00')
    #[arg(long, default_value = "24:00:00")]
    pub time: String,

    /// Modules to load before running (comma-separated)
    #[arg(long, default_value = "")]
    pub modules: String,
}

impl SlurmArgs {
    pub fn to_config(&self, job_name: &str) -> SlurmConfig {
        let modules = self
            .modules
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        SlurmConfig {
            job_name: job_name.to_string(),
            partition: self.partition.clone(),
            constraint: self.constraint.clone(),
            nodes: self.nodes,
            ntasks: self.ntasks,
            cpus_per_task: self.cpus_per_task,
            mem_per_cpu: self.mem_per_cpu.clone(),
            time_limit: self.time.clone(),
            modules,
            ..SlurmConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Basis, CalculationType, KPoints};
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_json_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("params.json");
        fs::write(
            &path,
            r#"{"kpoints": [3, 3, 3], "calculation_type": "dos", "basis_pscf": "EB"}"#,
        )
        .unwrap();

        let args = ParamArgs {
            params: Some(path),
            calculation_type: Some("bond".to_string()),
            ..ParamArgs::default()
        };
        let params = args.to_parameters().unwrap();
        assert_eq!(params.calculation_type(), CalculationType::Bond);
        assert_eq!(params.basis_pscf(), Basis::EB);
        assert_eq!(params.kpoints(), KPoints::new(3, 3, 3).unwrap());
    }

    #[test]
    fn test_unknown_json_key_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("params.json");
        fs::write(&path, r#"{"kpoint": [3, 3, 3]}"#).unwrap();

        let args = ParamArgs {
            params: Some(path),
            ..ParamArgs::default()
        };
        assert!(args.to_parameters().is_err());
    }
}
