//! # SCF + post-SCF 工作流
//!
//! 一次 SCF 计算之后接若干 post-SCF 计算（dos, bond, optc ...）。
//! 每个阶段是独立的 `JobPlan`，结果按阶段评估：SCF 失败或未收敛时后续阶段没有意义，
//! post-SCF 阶段失败只报告，不影响整体。
//!
//! ## 依赖关系
//! - 被 `commands/prepare.rs` 使用
//! - 使用 `planner/`, `models/`

use crate::error::{OlcaoError, Result};
use crate::models::{
    CalculationParametersBuilder, CalculationType, JobPlan, ResultRecord, StructureDescriptor,
};
use crate::planner;
use std::collections::HashSet;

/// 工作流中的一个阶段
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowStage {
    pub calculation_type: CalculationType,
    pub plan: JobPlan,
}

/// 生成 SCF 阶段和每个 post-SCF 阶段的计划。
///
/// `base` 中的网格、基组和边设置会带到每个阶段；未显式指定 `basis_pscf` 时
/// 各阶段按计算类型取推荐基组。
pub fn plan_workflow(
    base: &CalculationParametersBuilder,
    post_types: &[CalculationType],
    structure: &StructureDescriptor,
) -> Result<Vec<WorkflowStage>> {
    let mut seen = HashSet::new();
    for t in post_types {
        if !t.is_post_scf() {
            return Err(OlcaoError::validation(
                "'scf' is always run first and cannot be listed as a post-SCF calculation",
            ));
        }
        if !seen.insert(*t) {
            return Err(OlcaoError::validation(format!(
                "calculation '{}' is listed more than once",
                t
            )));
        }
    }

    std::iter::once(CalculationType::Scf)
        .chain(post_types.iter().copied())
        .map(|calculation_type| {
            let params = base.clone().calculation_type(calculation_type).build()?;
            Ok(WorkflowStage {
                calculation_type,
                plan: planner::plan(&params, structure)?,
            })
        })
        .collect()
}

/// 工作流整体结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// SCF 收敛且所有 post-SCF 阶段成功
    Completed,
    /// SCF 收敛，部分 post-SCF 阶段失败
    CompletedWithFailures,
    /// SCF 失败或未收敛，后续阶段没有意义
    ScfStopped,
}

/// 各阶段结果汇总
#[derive(Debug, Clone)]
pub struct WorkflowSummary {
    pub outcome: WorkflowOutcome,
    pub exit_code: i32,
    pub failed_stages: Vec<CalculationType>,
}

impl WorkflowSummary {
    pub fn evaluate(scf: &ResultRecord, post: &[(CalculationType, ResultRecord)]) -> Self {
        if !scf.is_ok() || !scf.converged {
            return WorkflowSummary {
                outcome: WorkflowOutcome::ScfStopped,
                exit_code: scf.exit_code(),
                failed_stages: vec![CalculationType::Scf],
            };
        }

        let failed_stages: Vec<CalculationType> = post
            .iter()
            .filter(|(_, record)| !record.is_ok())
            .map(|(t, _)| *t)
            .collect();

        WorkflowSummary {
            outcome: if failed_stages.is_empty() {
                WorkflowOutcome::Completed
            } else {
                WorkflowOutcome::CompletedWithFailures
            },
            exit_code: scf.exit_code(),
            failed_stages,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome != WorkflowOutcome::ScfStopped
    }
}
