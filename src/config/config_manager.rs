// ==========================================
// 车队排班系统 - 配置管理器
// ==========================================
// 职责: 从 config_kv 表加载覆写项，合成不可变的 SchedulerConfig
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::config::scheduler_config::{ConfigError, SchedulerConfig};
use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, ConfigError> {
        let conn = open_sqlite_connection(db_path).map_err(storage)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 从 config_kv 表读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::Storage(format!("锁获取失败: {}", e)))?;

        conn.query_row(
            "SELECT value FROM config_kv WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(storage)
    }

    /// 写入配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::Storage(format!("锁获取失败: {}", e)))?;

        conn.execute(
            "INSERT INTO config_kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )
        .map_err(storage)?;
        Ok(())
    }

    /// 读取并解析配置值；缺失时返回默认值，格式错误时告警并返回默认值
    fn get_parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + Copy,
    {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };

        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    "配置格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 合成排班配置（默认值 + config_kv 覆写），并校验
    pub fn load_scheduler_config(&self) -> Result<SchedulerConfig, ConfigError> {
        let defaults = SchedulerConfig::default();
        let mut config = defaults.clone();

        // ===== 线路优化规则 =====
        let o = &mut config.optimization;
        let d = &defaults.optimization;
        o.max_route_distance_km =
            self.get_parsed_or(config_keys::MAX_ROUTE_DISTANCE_KM, d.max_route_distance_km)?;
        o.max_route_duration_hours =
            self.get_parsed_or(config_keys::MAX_ROUTE_DURATION_HOURS, d.max_route_duration_hours)?;
        o.long_route_distance_km =
            self.get_parsed_or(config_keys::LONG_ROUTE_DISTANCE_KM, d.long_route_distance_km)?;
        o.frequency_normalizer_trips = self.get_parsed_or(
            config_keys::FREQUENCY_NORMALIZER_TRIPS,
            d.frequency_normalizer_trips,
        )?;
        o.revenue_normalizer_fare =
            self.get_parsed_or(config_keys::REVENUE_NORMALIZER_FARE, d.revenue_normalizer_fare)?;
        o.max_buses_per_route =
            self.get_parsed_or(config_keys::MAX_BUSES_PER_ROUTE, d.max_buses_per_route)?;
        o.min_buses_per_route =
            self.get_parsed_or(config_keys::MIN_BUSES_PER_ROUTE, d.min_buses_per_route)?;
        o.min_bus_capacity = self.get_parsed_or(config_keys::MIN_BUS_CAPACITY, d.min_bus_capacity)?;
        o.history_window_days =
            self.get_parsed_or(config_keys::HISTORY_WINDOW_DAYS, d.history_window_days)?;

        // ===== 批量调度 =====
        let s = &mut config.scheduling;
        let d = &defaults.scheduling;
        s.default_days_to_schedule =
            self.get_parsed_or(config_keys::DEFAULT_DAYS_TO_SCHEDULE, d.default_days_to_schedule)?;
        s.max_concurrent_scheduling = self.get_parsed_or(
            config_keys::MAX_CONCURRENT_SCHEDULING,
            d.max_concurrent_scheduling,
        )?;
        s.optimization_task_timeout_secs = self.get_parsed_or(
            config_keys::OPTIMIZATION_TASK_TIMEOUT_SECS,
            d.optimization_task_timeout_secs,
        )?;
        s.depot_task_timeout_secs =
            self.get_parsed_or(config_keys::DEPOT_TASK_TIMEOUT_SECS, d.depot_task_timeout_secs)?;

        // ===== 报告阈值 =====
        let r = &mut config.report;
        let d = &defaults.report;
        r.warning_success_rate =
            self.get_parsed_or(config_keys::WARNING_SUCCESS_RATE, d.warning_success_rate)?;
        r.critical_success_rate =
            self.get_parsed_or(config_keys::CRITICAL_SUCCESS_RATE, d.critical_success_rate)?;
        r.under_performer_trips =
            self.get_parsed_or(config_keys::UNDER_PERFORMER_TRIPS, d.under_performer_trips)?;
        r.low_trip_depot_trips =
            self.get_parsed_or(config_keys::LOW_TRIP_DEPOT_TRIPS, d.low_trip_depot_trips)?;
        r.min_average_trips_per_bus = self.get_parsed_or(
            config_keys::MIN_AVERAGE_TRIPS_PER_BUS,
            d.min_average_trips_per_bus,
        )?;
        r.ranking_size = self.get_parsed_or(config_keys::RANKING_SIZE, d.ranking_size)?;

        // ===== 车次生成 =====
        config.trip_generation.max_bus_daily_trips = self.get_parsed_or(
            config_keys::MAX_BUS_DAILY_TRIPS,
            defaults.trip_generation.max_bus_daily_trips,
        )?;

        config.validate()?;
        Ok(config)
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 随报告一同记录本次运行的生效覆写项
    pub fn get_config_snapshot(&self) -> Result<String, ConfigError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::Storage(format!("锁获取失败: {}", e)))?;

        let mut stmt = conn
            .prepare("SELECT key, value FROM config_kv ORDER BY key")
            .map_err(storage)?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(storage)?;

        for row in rows {
            let (key, value) = row.map_err(storage)?;
            config_map.insert(key, value);
        }

        serde_json::to_string(&json!(config_map)).map_err(|e| ConfigError::Storage(e.to_string()))
    }
}

fn storage(err: rusqlite::Error) -> ConfigError {
    ConfigError::Storage(err.to_string())
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 线路优化
    pub const MAX_ROUTE_DISTANCE_KM: &str = "max_route_distance_km";
    pub const MAX_ROUTE_DURATION_HOURS: &str = "max_route_duration_hours";
    pub const LONG_ROUTE_DISTANCE_KM: &str = "long_route_distance_km";
    pub const FREQUENCY_NORMALIZER_TRIPS: &str = "frequency_normalizer_trips";
    pub const REVENUE_NORMALIZER_FARE: &str = "revenue_normalizer_fare";
    pub const MAX_BUSES_PER_ROUTE: &str = "max_buses_per_route";
    pub const MIN_BUSES_PER_ROUTE: &str = "min_buses_per_route";
    pub const MIN_BUS_CAPACITY: &str = "min_bus_capacity";
    pub const HISTORY_WINDOW_DAYS: &str = "history_window_days";

    // 批量调度
    pub const DEFAULT_DAYS_TO_SCHEDULE: &str = "default_days_to_schedule";
    pub const MAX_CONCURRENT_SCHEDULING: &str = "max_concurrent_scheduling";
    pub const OPTIMIZATION_TASK_TIMEOUT_SECS: &str = "optimization_task_timeout_secs";
    pub const DEPOT_TASK_TIMEOUT_SECS: &str = "depot_task_timeout_secs";

    // 报告阈值
    pub const WARNING_SUCCESS_RATE: &str = "warning_success_rate";
    pub const CRITICAL_SUCCESS_RATE: &str = "critical_success_rate";
    pub const UNDER_PERFORMER_TRIPS: &str = "under_performer_trips";
    pub const LOW_TRIP_DEPOT_TRIPS: &str = "low_trip_depot_trips";
    pub const MIN_AVERAGE_TRIPS_PER_BUS: &str = "min_average_trips_per_bus";
    pub const RANKING_SIZE: &str = "ranking_size";

    // 车次生成
    pub const MAX_BUS_DAILY_TRIPS: &str = "max_bus_daily_trips";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_empty_table_yields_defaults() {
        let config = manager().load_scheduler_config().unwrap();
        assert_eq!(config, SchedulerConfig::default());
    }

    #[test]
    fn test_overrides_applied_and_malformed_ignored() {
        let manager = manager();
        manager
            .set_config_value(config_keys::MAX_CONCURRENT_SCHEDULING, "25")
            .unwrap();
        manager
            .set_config_value(config_keys::MAX_BUSES_PER_ROUTE, "not-a-number")
            .unwrap();

        let config = manager.load_scheduler_config().unwrap();
        assert_eq!(config.scheduling.max_concurrent_scheduling, 25);
        assert_eq!(config.optimization.max_buses_per_route, 10);

        let snapshot = manager.get_config_snapshot().unwrap();
        assert!(snapshot.contains("max_concurrent_scheduling"));
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let manager = manager();
        manager
            .set_config_value(config_keys::MAX_CONCURRENT_SCHEDULING, "0")
            .unwrap();
        assert!(manager.load_scheduler_config().is_err());
    }

    #[test]
    fn test_every_threshold_is_overridable() {
        let manager = manager();
        for (key, value) in [
            (config_keys::FREQUENCY_NORMALIZER_TRIPS, "60"),
            (config_keys::REVENUE_NORMALIZER_FARE, "250.5"),
            (config_keys::UNDER_PERFORMER_TRIPS, "3"),
            (config_keys::LOW_TRIP_DEPOT_TRIPS, "2"),
            (config_keys::MIN_AVERAGE_TRIPS_PER_BUS, "1.5"),
            (config_keys::RANKING_SIZE, "10"),
        ] {
            manager.set_config_value(key, value).unwrap();
        }

        let config = manager.load_scheduler_config().unwrap();
        assert_eq!(config.optimization.frequency_normalizer_trips, 60.0);
        assert_eq!(config.optimization.revenue_normalizer_fare, 250.5);
        assert_eq!(config.report.under_performer_trips, 3);
        assert_eq!(config.report.low_trip_depot_trips, 2);
        assert_eq!(config.report.min_average_trips_per_bus, 1.5);
        assert_eq!(config.report.ranking_size, 10);
    }

    #[test]
    fn test_oversized_history_window_is_rejected() {
        let manager = manager();
        manager
            .set_config_value(config_keys::HISTORY_WINDOW_DAYS, &u32::MAX.to_string())
            .unwrap();
        let err = manager.load_scheduler_config().unwrap_err();
        assert!(err.to_string().contains("history_window_days"));
    }
}
