// ==========================================
// 车队排班系统 - 排班配置
// ==========================================
// 职责: 优化规则 / 批量调度 / 报告阈值 / 车次生成 参数定义
// 红线: 配置为不可变值，构造后以 Arc 注入各引擎，不存在进程级单例
// ==========================================

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// 配置校验错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("配置值无效 (key={key}): {message}")]
    InvalidValue { key: String, message: String },

    #[error("配置读取失败: {0}")]
    Storage(String),
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

// ==========================================
// SchedulerConfig - 排班总配置
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub optimization: OptimizationRules,
    pub scheduling: SchedulingConfig,
    pub report: ReportThresholds,
    pub trip_generation: TripGenerationRules,
}

impl SchedulerConfig {
    /// 校验配置一致性
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.optimization.validate()?;
        self.scheduling.validate()?;
        self.report.validate()?;
        self.trip_generation.validate()?;
        Ok(())
    }
}

// ==========================================
// OptimizationRules - 线路优化规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationRules {
    // ===== 距离 / 时长归一化 =====
    pub max_route_distance_km: f64,
    pub max_route_duration_hours: f64,
    pub long_route_distance_km: f64, // 超过此距离需双倍车辆、卧铺加分

    // ===== 需求归一化 =====
    pub frequency_normalizer_trips: f64, // 车次数满分基准
    pub revenue_normalizer_fare: f64,    // 平均票价满分基准

    // ===== 分配规则 =====
    pub max_buses_per_route: u32,
    pub min_buses_per_route: u32,
    pub min_bus_capacity: u32,

    // ===== 历史窗口 =====
    pub history_window_days: u32,
}

/// 历史窗口上限（天）
pub const MAX_HISTORY_WINDOW_DAYS: u32 = 3660;

impl Default for OptimizationRules {
    fn default() -> Self {
        Self {
            max_route_distance_km: 500.0,
            max_route_duration_hours: 8.0,
            long_route_distance_km: 200.0,
            frequency_normalizer_trips: 30.0,
            revenue_normalizer_fare: 500.0,
            max_buses_per_route: 10,
            min_buses_per_route: 1,
            min_bus_capacity: 30,
            history_window_days: 30,
        }
    }
}

impl OptimizationRules {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_route_distance_km > 0.0) {
            return Err(invalid("max_route_distance_km", "必须大于 0"));
        }
        if !(self.max_route_duration_hours > 0.0) {
            return Err(invalid("max_route_duration_hours", "必须大于 0"));
        }
        if !(self.frequency_normalizer_trips > 0.0) {
            return Err(invalid("frequency_normalizer_trips", "必须大于 0"));
        }
        if !(self.revenue_normalizer_fare > 0.0) {
            return Err(invalid("revenue_normalizer_fare", "必须大于 0"));
        }
        if self.max_buses_per_route == 0 {
            return Err(invalid("max_buses_per_route", "必须大于 0"));
        }
        if self.min_buses_per_route > self.max_buses_per_route {
            return Err(invalid(
                "min_buses_per_route",
                format!(
                    "不得大于 max_buses_per_route ({} > {})",
                    self.min_buses_per_route, self.max_buses_per_route
                ),
            ));
        }
        if self.history_window_days == 0 || self.history_window_days > MAX_HISTORY_WINDOW_DAYS {
            return Err(invalid(
                "history_window_days",
                format!("必须在 1..={} 之间", MAX_HISTORY_WINDOW_DAYS),
            ));
        }
        Ok(())
    }
}

// ==========================================
// SchedulingConfig - 批量调度配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub default_days_to_schedule: u32,
    pub max_concurrent_scheduling: usize,
    pub optimization_task_timeout_secs: u64,
    pub depot_task_timeout_secs: u64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_days_to_schedule: 7,
            max_concurrent_scheduling: 100,
            optimization_task_timeout_secs: 300,
            depot_task_timeout_secs: 600,
        }
    }
}

impl SchedulingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_scheduling == 0 {
            return Err(invalid("max_concurrent_scheduling", "必须大于 0"));
        }
        if self.optimization_task_timeout_secs == 0 {
            return Err(invalid("optimization_task_timeout_secs", "必须大于 0"));
        }
        if self.depot_task_timeout_secs == 0 {
            return Err(invalid("depot_task_timeout_secs", "必须大于 0"));
        }
        Ok(())
    }

    pub fn optimization_task_timeout(&self) -> Duration {
        Duration::from_secs(self.optimization_task_timeout_secs)
    }

    pub fn depot_task_timeout(&self) -> Duration {
        Duration::from_secs(self.depot_task_timeout_secs)
    }
}

// ==========================================
// ReportThresholds - 报告阈值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportThresholds {
    pub warning_success_rate: f64,  // 百分比
    pub critical_success_rate: f64, // 百分比
    pub under_performer_trips: usize,
    pub low_trip_depot_trips: usize,
    pub min_average_trips_per_bus: f64,
    pub ranking_size: usize,
}

impl Default for ReportThresholds {
    fn default() -> Self {
        Self {
            warning_success_rate: 80.0,
            critical_success_rate: 60.0,
            under_performer_trips: 10,
            low_trip_depot_trips: 5,
            min_average_trips_per_bus: 2.0,
            ranking_size: 5,
        }
    }
}

impl ReportThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, rate) in [
            ("warning_success_rate", self.warning_success_rate),
            ("critical_success_rate", self.critical_success_rate),
        ] {
            if !(0.0..=100.0).contains(&rate) {
                return Err(invalid(key, "必须在 0..=100 之间"));
            }
        }
        if self.ranking_size == 0 {
            return Err(invalid("ranking_size", "必须大于 0"));
        }
        Ok(())
    }
}

// ==========================================
// TripGenerationRules - 车次生成规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripGenerationRules {
    pub max_bus_daily_trips: u32,
}

impl Default for TripGenerationRules {
    fn default() -> Self {
        Self {
            max_bus_daily_trips: 4,
        }
    }
}

impl TripGenerationRules {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bus_daily_trips == 0 {
            return Err(invalid("max_bus_daily_trips", "必须大于 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SchedulerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.optimization.max_buses_per_route, 10);
        assert_eq!(config.scheduling.max_concurrent_scheduling, 100);
    }

    #[test]
    fn test_validate_rejects_inconsistent_bus_limits() {
        let mut config = SchedulerConfig::default();
        config.optimization.min_buses_per_route = 11;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_buses_per_route"));

        let mut config = SchedulerConfig::default();
        config.scheduling.max_concurrent_scheduling = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_history_window() {
        let mut config = SchedulerConfig::default();
        config.optimization.history_window_days = u32::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("history_window_days"));

        config.optimization.history_window_days = 0;
        assert!(config.validate().is_err());

        config.optimization.history_window_days = MAX_HISTORY_WINDOW_DAYS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_report_thresholds() {
        let mut config = SchedulerConfig::default();
        config.report.warning_success_rate = 120.0;
        assert!(config.validate().is_err());

        let mut config = SchedulerConfig::default();
        config.report.ranking_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{"scheduling": {"max_concurrent_scheduling": 8}}"#).unwrap();
        assert_eq!(config.scheduling.max_concurrent_scheduling, 8);
        assert_eq!(config.scheduling.default_days_to_schedule, 7);
        assert_eq!(config.optimization, OptimizationRules::default());
    }
}
