// ==========================================
// 车队排班系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约束: 失败原因原样保留，最终写入报告
// ==========================================

use crate::domain::score::ScoreError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 线路优化错误
#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("仓储访问失败: {0}")]
    Repository(#[from] RepositoryError),

    #[error("评分越界: {0}")]
    InvalidScore(#[from] ScoreError),
}

/// 批量排班错误
#[derive(Error, Debug)]
pub enum SchedulingError {
    // ===== 全局前置条件 =====
    #[error("日期范围无效: start={start} > end={end}")]
    InvalidDateRange { start: String, end: String },

    #[error("分析窗口超出日历范围: 截止 {as_of} 的最近 {days} 天")]
    AnalysisWindowOutOfRange { as_of: String, days: u32 },

    // ===== 单车场失败 =====
    #[error("车场线路优化失败 (depot={depot_id}): {reason}")]
    DepotOptimization { depot_id: String, reason: String },

    #[error("{reason}")]
    DepotScheduling { depot_id: String, reason: String },

    #[error("任务超时 ({secs}s)")]
    Timeout { secs: u64 },

    #[error("cancelled")]
    Cancelled,

    #[error("任务异常终止: {0}")]
    TaskAborted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimizer_error_keeps_store_message() {
        let err: OptimizerError = RepositoryError::DatabaseQueryError("disk I/O error".to_string()).into();
        assert!(err.to_string().contains("disk I/O error"));
    }

    #[test]
    fn test_depot_scheduling_reason_is_verbatim() {
        let err = SchedulingError::DepotScheduling {
            depot_id: "D2".to_string(),
            reason: "generator exploded".to_string(),
        };
        assert_eq!(err.to_string(), "generator exploded");
    }
}
