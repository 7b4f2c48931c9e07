// ==========================================
// 车队排班系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 提供幂等的建表脚本，CLI 与集成测试共用
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 显式指定数据库路径的环境变量
pub const DB_PATH_ENV: &str = "FLEET_SCHEDULER_DB_PATH";

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 日期 / 时刻的存储格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化数据库 schema（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS depot (
            depot_id TEXT PRIMARY KEY,
            depot_name TEXT NOT NULL,
            depot_code TEXT
        );

        CREATE TABLE IF NOT EXISTS bus (
            bus_id TEXT PRIMARY KEY,
            bus_number TEXT NOT NULL,
            depot_id TEXT REFERENCES depot(depot_id),
            capacity INTEGER NOT NULL,
            is_ac INTEGER NOT NULL DEFAULT 0,
            is_sleeper INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active',
            current_route_id TEXT,
            current_route_name TEXT,
            current_route_assigned_at TEXT,
            revision INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_bus_depot_status ON bus(depot_id, status);

        CREATE TABLE IF NOT EXISTS route (
            route_id TEXT PRIMARY KEY,
            route_number TEXT NOT NULL,
            route_name TEXT NOT NULL,
            depot_id TEXT NOT NULL REFERENCES depot(depot_id),
            total_distance_km REAL NOT NULL DEFAULT 0,
            base_fare REAL NOT NULL DEFAULT 0,
            requires_ac INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active',
            is_active INTEGER NOT NULL DEFAULT 1,
            revision INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_route_depot ON route(depot_id);

        CREATE TABLE IF NOT EXISTS route_schedule (
            schedule_id TEXT PRIMARY KEY,
            route_id TEXT NOT NULL REFERENCES route(route_id) ON DELETE CASCADE,
            departure_time TEXT NOT NULL,
            arrival_time TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS route_assigned_bus (
            route_id TEXT NOT NULL REFERENCES route(route_id) ON DELETE CASCADE,
            bus_id TEXT NOT NULL,
            bus_number TEXT NOT NULL,
            capacity INTEGER NOT NULL,
            assigned_at TEXT NOT NULL,
            PRIMARY KEY (route_id, bus_id)
        );

        CREATE TABLE IF NOT EXISTS trip (
            trip_id TEXT PRIMARY KEY,
            route_id TEXT NOT NULL,
            bus_id TEXT NOT NULL,
            service_date TEXT NOT NULL,
            departure_time TEXT NOT NULL,
            arrival_time TEXT NOT NULL,
            status TEXT NOT NULL,
            capacity INTEGER NOT NULL,
            booked_seats INTEGER NOT NULL DEFAULT 0,
            fare REAL NOT NULL DEFAULT 0,
            UNIQUE (route_id, bus_id, service_date, departure_time)
        );
        CREATE INDEX IF NOT EXISTS idx_trip_route_date ON trip(route_id, service_date);

        CREATE TABLE IF NOT EXISTS staff (
            staff_id TEXT PRIMARY KEY,
            staff_name TEXT NOT NULL,
            role TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active'
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 默认数据库路径
///
/// 优先级: FLEET_SCHEDULER_DB_PATH → 用户数据目录/fleet-scheduler/fleet.db → ./fleet.db
pub fn default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./fleet.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("fleet-scheduler");
        // 目录创建失败时由后续 open 报出具体错误
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("fleet.db");
    }
    path.to_string_lossy().to_string()
}
