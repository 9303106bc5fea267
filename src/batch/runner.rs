//! # 批量执行器
//!
//! 并行执行批量处理任务。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代，输出顺序与输入一致
//! - 进度条显示
//! - 结果分类统计
//!
//! ## 依赖关系
//! - 被 `commands/collect.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::error::{OlcaoError, Result};
use crate::utils::progress;

use rayon::prelude::*;
use std::path::PathBuf;

/// 单个作业的处理结论
#[derive(Debug, Clone)]
pub enum ProcessResult {
    /// 成功且收敛
    Success,
    /// 正常结束但未收敛
    NotConverged,
    /// 失败
    Failed(String, String), // (作业, 原因)
}

/// 批量处理结果统计
#[derive(Debug, Default)]
pub struct BatchResult {
    pub success: usize,
    pub not_converged: usize,
    pub failed: usize,
    /// 失败详情
    pub failures: Vec<(String, String)>,
}

impl BatchResult {
    /// 合并处理结果
    pub fn merge(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Success => self.success += 1,
            ProcessResult::NotConverged => self.not_converged += 1,
            ProcessResult::Failed(job, err) => {
                self.failed += 1;
                self.failures.push((job, err));
            }
        }
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.success + self.not_converged + self.failed
    }
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
}

impl BatchRunner {
    /// 创建新的批量执行器，0 表示使用全部 CPU
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    /// 并行处理，结果顺序与输入一致
    pub fn run<T, F>(&self, items: Vec<PathBuf>, processor: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(&PathBuf) -> T + Sync + Send,
    {
        let pb = progress::create_progress_bar(items.len() as u64, "Extracting");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| OlcaoError::Other(format!("failed to start thread pool: {}", e)))?;

        let results: Vec<T> = pool.install(|| {
            items
                .par_iter()
                .map(|item| {
                    let result = processor(item);
                    pb.inc(1);
                    result
                })
                .collect()
        });

        pb.finish_and_clear();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_preserves_order() {
        let items: Vec<PathBuf> = (0..20).map(|i| PathBuf::from(format!("job{:02}", i))).collect();
        let out = BatchRunner::new(4)
            .run(items.clone(), |p| p.display().to_string())
            .unwrap();
        let expected: Vec<String> = items.iter().map(|p| p.display().to_string()).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_batch_result_tally() {
        let mut summary = BatchResult::default();
        summary.merge(ProcessResult::Success);
        summary.merge(ProcessResult::NotConverged);
        summary.merge(ProcessResult::Failed("c".into(), "exit 301".into()));
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.failures, vec![("c".to_string(), "exit 301".to_string())]);
    }
}
