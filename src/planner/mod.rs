//! # 作业规划器
//!
//! 把已校验的 `CalculationParameters` 和骨架结构翻译成 `JobPlan`：
//! makeinput 参数、uolcao 参数和需要取回的输出文件集合。
//! 纯函数，无 I/O，相同输入总是得到相同的计划。
//!
//! ## 依赖关系
//! - 被 `workflow.rs`, `commands/` 使用
//! - 使用 `models/`
//! - 子模块: tables

mod tables;

use crate::error::{OlcaoError, Result};
use crate::models::{CalculationParameters, CalculationType, JobPlan, StructureDescriptor};
use std::collections::BTreeSet;
use tracing::debug;

/// 生成作业计划
pub fn plan(params: &CalculationParameters, structure: &StructureDescriptor) -> Result<JobPlan> {
    if structure.num_atoms() == 0 {
        return Err(OlcaoError::validation(
            "structure has no atoms, nothing to stage as olcao.skl",
        ));
    }

    let calculation_type = params.calculation_type();
    let edge = params.edge().clone();
    let basis_scf = params.basis_scf();
    let basis_pscf = params.basis_pscf();

    let preprocessor_args = preprocessor_args(params);
    let solver_args = solver_args(params);

    let stage_basis = match calculation_type {
        CalculationType::Scf => basis_scf,
        _ => basis_pscf,
    };

    let mut expected_outputs = BTreeSet::new();
    expected_outputs.extend(tables::always_present(&edge));
    expected_outputs.extend(tables::property_outputs(calculation_type, &edge, stage_basis));
    expected_outputs.insert(tables::preprocess_marker());

    debug!(
        calculation_type = %calculation_type,
        edge = %edge,
        makeinput = ?preprocessor_args,
        uolcao = ?solver_args,
        outputs = expected_outputs.len(),
        "planned OLCAO job for {}",
        structure.formula()
    );

    Ok(JobPlan::new(
        preprocessor_args,
        solver_args,
        expected_outputs,
        calculation_type,
        edge,
        basis_scf,
        basis_pscf,
    ))
}

/// 两个阶段网格相同时用 `-kp`，否则分别给出
fn preprocessor_args(params: &CalculationParameters) -> Vec<String> {
    let scf = params.effective_kpoints_scf();
    let pscf = params.effective_kpoints_pscf();

    let mut args = Vec::new();
    if scf == pscf {
        args.push("-kp".to_string());
        args.extend(scf.to_args());
    } else {
        args.push("-scfkp".to_string());
        args.extend(scf.to_args());
        args.push("-pscfkp".to_string());
        args.extend(pscf.to_args());
    }
    args
}

/// `-<type> <basis> [edge]`
fn solver_args(params: &CalculationParameters) -> Vec<String> {
    let calculation_type = params.calculation_type();
    let basis = match calculation_type {
        CalculationType::Scf => params.basis_scf(),
        _ => params.basis_pscf(),
    };

    let mut args = vec![format!("-{}", calculation_type), basis.to_string()];
    if !params.edge().is_ground_state() {
        args.push(params.edge().to_string());
    }
    args
}
