// ==========================================
// 车队排班系统 - 配置层
// ==========================================
// 职责: 排班参数定义与 config_kv 覆写加载
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod scheduler_config;

// 重导出核心配置
pub use config_manager::{config_keys, ConfigManager};
pub use scheduler_config::{
    ConfigError, OptimizationRules, MAX_HISTORY_WINDOW_DAYS, ReportThresholds, SchedulerConfig, SchedulingConfig,
    TripGenerationRules,
};
