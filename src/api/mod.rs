// ==========================================
// 车队排班系统 - API 层
// ==========================================
// 职责: 提供批量排班业务接口,供命令行入口调用
// ==========================================

pub mod error;
pub mod scheduling_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use scheduling_api::{ScheduleOptions, SchedulingApi};
