//! # olcaokit - OLCAO 作业规划与结果提取
//!
//! 为 OLCAO 两阶段流程（makeinput 预处理 → uolcao 求解）生成确定性的作业计划，
//! 并把取回的输出文件解析成带失败分类的结果记录。
//!
//! 核心入口：
//! - [`planner::plan`]：参数 + 骨架 → [`models::JobPlan`]
//! - [`extractor::extract`]：取回目录 + 计划 → [`models::ResultRecord`]
//! - [`workflow::plan_workflow`]：SCF + post-SCF 多阶段计划
//!
//! ## 依赖关系
//! ```text
//! lib.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── planner/   (作业规划)
//!   │     ├── extractor/ (结果提取)
//!   │     ├── workflow   (SCF + post-SCF)
//!   │     ├── parsers/   (格式解析器)
//!   │     └── models/    (数据模型)
//!   ├── batch/      (文件收集与并行执行)
//!   ├── utils/      (工具函数)
//!   ├── logging     (tracing 初始化)
//!   └── error.rs    (错误处理)
//! ```

pub mod batch;
pub mod cli;
pub mod commands;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod models;
pub mod parsers;
pub mod planner;
pub mod utils;
pub mod workflow;

pub use error::{OlcaoError, Result};
pub use extractor::extract;
pub use planner::plan;
