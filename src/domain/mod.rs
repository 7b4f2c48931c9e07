// ==========================================
// 车队排班系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、评分值对象、派生结果与报告
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod analysis;
pub mod fleet;
pub mod report;
pub mod score;
pub mod types;

// 重导出核心类型
pub use analysis::{
    Assignment, BusAssignment, OptimizationOutcome, RouteAnalysis, RouteApplyFailure,
    RouteOptimizationReport, RouteOptimizationSummary,
};
pub use fleet::{AssignedBus, Bus, CurrentRoute, DateRange, Depot, Route, RouteSchedule, Trip};
pub use report::{
    DepotBreakdown, DepotSchedulingResult, PerformanceRanking, Recommendation, Report,
    ReportDateRange, ReportMetadata, ReportSummary, TopPerformer, UnderPerformer,
};
pub use score::{ScoreError, UnitScore};
pub use types::{DepotPhase, RecommendationType, RouteRecommendation, StaffRole, TripStatus};
