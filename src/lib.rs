// ==========================================
// 车队排班系统 - 核心库
// ==========================================
// 技术栈: Rust + Tokio + SQLite
// 系统定位: 批量排班与线路优化引擎（命令行调用）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体、评分与报告
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 排班配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 性能埋点
pub mod perf;

// 国际化
pub mod i18n;

// API 层 - 批量排班入口
pub mod api;

// 文本渲染
pub mod render;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    Bus, DateRange, Depot, DepotPhase, DepotSchedulingResult, Report, Route, RouteAnalysis,
    RouteOptimizationReport, RouteRecommendation, Trip, TripStatus, UnitScore,
};

// 引擎
pub use engine::{
    AssignedRouteTripGenerator, BatchOrchestrator, CancellationSignal, ReadinessValidator,
    ReportBuilder, RouteOptimizer, TripGenerator,
};

// 配置
pub use config::{ConfigManager, SchedulerConfig};

// API
pub use api::{ApiError, ApiResult, SchedulingApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "车队排班系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
