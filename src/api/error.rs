// ==========================================
// 车队排班系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，将仓储/引擎/配置错误转换为调用方可读的错误
// 约束: 所有错误信息必须包含显式原因
// ==========================================

use crate::config::ConfigError;
use crate::engine::error::{OptimizerError, SchedulingError};
use crate::engine::readiness::ReadinessReport;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 前置条件错误
    // ==========================================
    /// 就绪检查未通过（携带完整诊断，不只是第一条）
    #[error("系统未就绪: {}", report.issues.join("; "))]
    NotReady { report: ReadinessReport },

    // ==========================================
    // 输入错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("乐观锁冲突: {0}")]
    OptimisticLockFailure(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 引擎错误
    // ==========================================
    #[error("线路优化失败: {0}")]
    OptimizationError(String),

    #[error("排班失败: {0}")]
    SchedulingError(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::OptimisticLockFailure {
                entity,
                id,
                expected,
                actual,
            } => ApiError::OptimisticLockFailure(format!(
                "{}(id={})已被其他调用修改（期望revision={}，实际revision={}）",
                entity, id, expected, actual
            )),
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

impl From<OptimizerError> for ApiError {
    fn from(err: OptimizerError) -> Self {
        match err {
            OptimizerError::Repository(e) => e.into(),
            other => ApiError::OptimizationError(other.to_string()),
        }
    }
}

impl From<SchedulingError> for ApiError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::InvalidDateRange { .. }
            | SchedulingError::AnalysisWindowOutOfRange { .. } => {
                ApiError::InvalidInput(err.to_string())
            }
            other => ApiError::SchedulingError(other.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
