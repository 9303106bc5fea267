//! # 数据模型模块
//!
//! 定义计算参数、晶体骨架、作业计划和结果记录。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `planner/`, `extractor/` 和 `commands/` 使用
//! - 子模块: params, structure, plan, result

pub mod params;
pub mod plan;
pub mod result;
pub mod structure;

pub use params::{
    Basis, CalculationParameters, CalculationParametersBuilder, CalculationType, Edge, KPoints,
    ParameterSet,
};
pub use plan::{JobPlan, OutputPattern, OutputRole};
pub use result::{FailureKind, Quantity, ResultRecord, Status};
pub use structure::{Atom, CellMode, Lattice, StructureDescriptor};
