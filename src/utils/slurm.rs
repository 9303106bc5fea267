//! # Slurm 脚本生成工具
//!
//! 为一个 OLCAO 作业目录生成 sbatch 脚本：加载环境、设置暂存目录、
//! 先运行 makeinput 再运行 uolcao。脚本只生成，不提交。
//!
//! ## 依赖关系
//! - 被 `commands/prepare.rs` 使用
//! - 使用 `models/plan.rs`

use crate::models::JobPlan;
use std::path::Path;

/// 调度器标准输出/错误文件名，提取时作为额外取回项
pub const SCHEDULER_STDOUT: &str = "_scheduler-stdout.txt";
pub const SCHEDULER_STDERR: &str = "_scheduler-stderr.txt";

/// Slurm 作业配置
#[derive(Debug, Clone)]
pub struct SlurmConfig {
    pub job_name: String,
    pub partition: Option<String>,
    pub constraint: Option<String>,
    pub nodes: u32,
    pub ntasks: u32,
    pub cpus_per_task: u32,
    pub mem_per_cpu: String,
    pub time_limit: String,
    pub modules: Vec<String>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl Default for SlurmConfig {
    fn default() -> Self {
        SlurmConfig {
            job_name: "olcao".to_string(),
            partition: None,
            constraint: None,
            nodes: 1,
            ntasks: 1,
            cpus_per_task: 1,
            mem_per_cpu: "4G".to_string(),
            time_limit: "24:00:00".to_string(),
            modules: vec![],
            stdout: Some(SCHEDULER_STDOUT.to_string()),
            stderr: Some(SCHEDULER_STDERR.to_string()),
        }
    }
}

impl SlurmConfig {
    /// 需要额外取回的调度器输出文件
    pub fn scheduler_files(&self) -> Vec<String> {
        self.stdout
            .iter()
            .chain(self.stderr.iter())
            .cloned()
            .collect()
    }
}

/// OLCAO 运行环境：rc 文件和两个可执行程序
#[derive(Debug, Clone)]
pub struct OlcaoEnvironment {
    /// 原样写入脚本，`$HOME` 等变量在计算节点上展开
    pub rc_file: String,
    pub makeinput: String,
    pub uolcao: String,
}

impl Default for OlcaoEnvironment {
    fn default() -> Self {
        OlcaoEnvironment {
            rc_file: "$HOME/.olcao/olcaorc".to_string(),
            makeinput: "makeinput".to_string(),
            uolcao: "uolcao".to_string(),
        }
    }
}

/// 生成 sbatch 脚本内容
pub fn generate_sbatch_script(
    config: &SlurmConfig,
    workdir: &Path,
    env: &OlcaoEnvironment,
    plan: &JobPlan,
) -> String {
    let mut directives = Vec::new();
    if let Some(constraint) = &config.constraint {
        directives.push(format!("#SBATCH --constraint \"{}\"", constraint));
    }
    if let Some(partition) = &config.partition {
        directives.push(format!("#SBATCH --partition {}", partition));
    }
    directives.push(format!("#SBATCH --nodes={}", config.nodes));
    directives.push(format!("#SBATCH --mem-per-cpu {}", config.mem_per_cpu));
    directives.push(format!("#SBATCH --time {}", config.time_limit));
    directives.push(format!("#SBATCH -c {}", config.cpus_per_task));
    directives.push(format!("#SBATCH -n {}", config.ntasks));
    directives.push(format!("#SBATCH -J {}", config.job_name));
    if let Some(stdout) = &config.stdout {
        directives.push(format!("#SBATCH -o {}", stdout));
    }
    if let Some(stderr) = &config.stderr {
        directives.push(format!("#SBATCH -e {}", stderr));
    }

    let module_loads = if config.modules.is_empty() {
        String::new()
    } else {
        let loads = config
            .modules
            .iter()
            .map(|m| format!("module load {}", m))
            .collect::<Vec<_>>()
            .join("\n");
        format!("module purge 2>&1\n{}\n", loads)
    };

    let (scratch_var, scratch_value) = plan.scratch_env();
    let makeinput_cmd = plan.preprocessor_command(&env.makeinput);
    let uolcao_cmd = plan.solver_command(&env.uolcao);

    format!(
        r#"#!/bin/bash
{}

set -euo pipefail

{}source "{}"

cd "{}"
export {}={}
echo "PWD=$(pwd)"

echo "Running: {}"
{}

echo "Running: {}"
{}
"#,
        directives.join("\n"),
        module_loads,
        env.rc_file,
        workdir.display(),
        scratch_var,
        scratch_value,
        makeinput_cmd,
        makeinput_cmd,
        uolcao_cmd,
        uolcao_cmd,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Atom, CalculationParameters, CalculationType, CellMode, Lattice, StructureDescriptor,
    };
    use crate::planner;

    fn dos_plan() -> JobPlan {
        let structure = StructureDescriptor {
            title: "C".to_string(),
            lattice: Lattice::from_parameters(3.567, 3.567, 3.567, 90.0, 90.0, 90.0),
            atoms: vec![Atom::new("C", [0.0, 0.0, 0.0])],
            space_group: "227_a".to_string(),
            supercell: [1, 1, 1],
            cell_mode: CellMode::Full,
        };
        let params = CalculationParameters::builder()
            .calculation_type(CalculationType::Dos)
            .build()
            .unwrap();
        planner::plan(&params, &structure).unwrap()
    }

    #[test]
    fn test_script_runs_both_stages_in_order() {
        let script = generate_sbatch_script(
            &SlurmConfig::default(),
            Path::new("/scratch/jobs/diamond"),
            &OlcaoEnvironment::default(),
            &dos_plan(),
        );

        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains("source \"$HOME/.olcao/olcaorc\""));
        assert!(script.contains("export OLCAO_TEMP=$PWD"));
        assert!(script.contains("#SBATCH -o _scheduler-stdout.txt"));
        assert!(!script.contains("--partition"));

        let makeinput = script.find("\nmakeinput -kp 1 1 1\n").unwrap();
        let uolcao = script.find("\nuolcao -dos FB\n").unwrap();
        let cd = script.find("cd \"/scratch/jobs/diamond\"").unwrap();
        assert!(cd < makeinput && makeinput < uolcao);
    }

    #[test]
    fn test_optional_directives_and_modules() {
        let config = SlurmConfig {
            partition: Some("cpu".to_string()),
            modules: vec!["olcao/2.0".to_string()],
            stdout: None,
            stderr: None,
            ..SlurmConfig::default()
        };
        let script = generate_sbatch_script(
            &config,
            Path::new("job"),
            &OlcaoEnvironment::default(),
            &dos_plan(),
        );
        assert!(script.contains("#SBATCH --partition cpu"));
        assert!(script.contains("module load olcao/2.0"));
        assert!(!script.contains("#SBATCH -o"));
        assert!(config.scheduler_files().is_empty());
        assert_eq!(SlurmConfig::default().scheduler_files().len(), 2);
    }
}
