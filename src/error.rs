//! # 统一错误处理模块
//!
//! 定义 olcaokit 的所有错误类型，使用 `thiserror` 派生。
//!
//! 提取阶段的失败（无输出目录、缺少输出文件等）不走这里，
//! 而是记录在 `models::result::FailureKind` 中。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// olcaokit 统一错误类型
#[derive(Error, Debug)]
pub enum OlcaoError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    // ─────────────────────────────────────────────────────────────
    // 参数校验错误（在生成作业计划之前拒绝）
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid calculation parameters: {0}")]
    Validation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 序列化错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

impl OlcaoError {
    pub fn validation(msg: impl Into<String>) -> Self {
        OlcaoError::Validation(msg.into())
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, OlcaoError>;
