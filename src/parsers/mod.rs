//! # 解析器模块
//!
//! 提供 OLCAO 骨架输入和文本输出的解析器。
//!
//! ## 依赖关系
//! - 被 `extractor/` 和 `commands/` 使用
//! - 使用 `models/` 数据模型
//! - 子模块: skeleton, olcao_out, dos

pub mod dos;
pub mod olcao_out;
pub mod skeleton;

pub use olcao_out::{parse_output_content, parse_output_file, OutputFields};
pub use skeleton::{parse_skeleton_content, parse_skeleton_file, to_skeleton_string};
