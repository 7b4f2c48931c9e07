// ==========================================
// 车队排班系统 - 引擎层
// ==========================================
// 流程: 就绪检查 → 库存收集 → 线路优化(并行) → 分批生成车次 → 报告
// ==========================================
// 职责: 实现排班业务规则,不拼 SQL
// 红线: Engine 不拼 SQL, 所有失败必须保留原因
// ==========================================

pub mod batch_orchestrator;
pub mod cancellation;
pub mod error;
pub mod inventory;
pub mod readiness;
pub mod report_builder;
pub mod route_optimizer;
pub mod trip_generator;

#[cfg(test)]
pub(crate) mod test_support;

// 重导出核心引擎
pub use batch_orchestrator::{batch_size, partition, BatchOrchestrator, BatchOutcome};
pub use cancellation::CancellationSignal;
pub use error::{OptimizerError, SchedulingError};
pub use inventory::{DepotInventory, DepotInventoryCollector};
pub use readiness::{ReadinessReport, ReadinessStats, ReadinessValidator};
pub use report_builder::ReportBuilder;
pub use route_optimizer::RouteOptimizer;
pub use trip_generator::{
    AssignedRouteTripGenerator, GenerationOptions, GenerationSummary, TripGenerator,
};
