// ==========================================
// 车队排班系统 - 线路优化引擎
// ==========================================
// 职责: 线路绩效评分 → 贪心车辆分配 → 写回
// 红线: INACTIVE 线路不分配车辆
// 红线: 单线路写回失败不影响其他线路
// ==========================================

mod analysis;
mod apply;
mod assignment;
mod core;


pub use analysis::{analyze_trips, classify_route};
pub use assignment::{
    buses_needed, calculate_assignments, compatibility_score, is_bus_compatible,
    optimization_score,
};
pub use self::core::RouteOptimizer;
