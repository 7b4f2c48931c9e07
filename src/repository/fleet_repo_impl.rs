// ==========================================
// 车队排班系统 - 车队数据仓储 SQLite 实现
// ==========================================
// 职责: 实现 FleetRepository Trait
// 约束: 所有查询使用参数化；写回带 revision 乐观锁检查
// ==========================================

use crate::db::{DATE_FORMAT, TIME_FORMAT};
use crate::domain::fleet::{
    AssignedBus, Bus, CurrentRoute, DateRange, Depot, Route, RouteSchedule, Trip,
};
use crate::domain::types::{StaffRole, TripStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::fleet_repo::FleetRepository;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// SqliteFleetRepository
// ==========================================
pub struct SqliteFleetRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteFleetRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn count(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row(sql, params, |row| row.get(0))?;
        Ok(n.max(0) as usize)
    }

    fn load_schedules(conn: &Connection, route_id: &str) -> RepositoryResult<Vec<RouteSchedule>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT schedule_id, departure_time, arrival_time
            FROM route_schedule
            WHERE route_id = ?1 AND is_active = 1
            ORDER BY departure_time, schedule_id
            "#,
        )?;
        let schedules = stmt
            .query_map(params![route_id], |row| {
                Ok(RouteSchedule {
                    schedule_id: row.get(0)?,
                    departure_time: parse_time(row, 1)?,
                    arrival_time: parse_time(row, 2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(schedules)
    }

    fn load_assigned_buses(conn: &Connection, route_id: &str) -> RepositoryResult<Vec<AssignedBus>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT bus_id, bus_number, capacity, assigned_at
            FROM route_assigned_bus
            WHERE route_id = ?1
            ORDER BY rowid
            "#,
        )?;
        let buses = stmt
            .query_map(params![route_id], |row| {
                Ok(AssignedBus {
                    bus_id: row.get(0)?,
                    bus_number: row.get(1)?,
                    capacity: row.get(2)?,
                    assigned_at: parse_datetime(row, 3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(buses)
    }

    /// 区分“记录不存在”与“revision 冲突”
    fn revision_conflict(
        conn: &Connection,
        table: &str,
        key_column: &str,
        entity: &str,
        id: &str,
        expected: i64,
    ) -> RepositoryError {
        let sql = format!("SELECT revision FROM {} WHERE {} = ?1", table, key_column);
        match conn
            .query_row(&sql, params![id], |row| row.get::<_, i64>(0))
            .optional()
        {
            Ok(Some(actual)) => RepositoryError::OptimisticLockFailure {
                entity: entity.to_string(),
                id: id.to_string(),
                expected,
                actual,
            },
            Ok(None) => RepositoryError::NotFound {
                entity: entity.to_string(),
                id: id.to_string(),
            },
            Err(e) => e.into(),
        }
    }
}

// ==========================================
// 行解析辅助函数
// ==========================================

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

fn parse_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveTime> {
    let raw: String = row.get(idx)?;
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn map_bus(row: &Row<'_>) -> rusqlite::Result<Bus> {
    let current_route_id: Option<String> = row.get(7)?;
    let current_route = match current_route_id {
        Some(route_id) => Some(CurrentRoute {
            route_id,
            route_name: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
            assigned_at: match row.get::<_, Option<String>>(9)? {
                Some(_) => parse_datetime(row, 9)?,
                None => DateTime::<Utc>::default(),
            },
        }),
        None => None,
    };

    Ok(Bus {
        bus_id: row.get(0)?,
        bus_number: row.get(1)?,
        depot_id: row.get(2)?,
        capacity: row.get(3)?,
        is_ac: row.get(4)?,
        is_sleeper: row.get(5)?,
        // 6: status (查询已过滤)
        current_route,
        revision: row.get(10)?,
    })
}

// ==========================================
// FleetRepository Trait 实现
// ==========================================
#[async_trait]
impl FleetRepository for SqliteFleetRepository {
    async fn list_depots(&self) -> RepositoryResult<Vec<Depot>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT depot_id, depot_name, depot_code FROM depot ORDER BY depot_id",
        )?;
        let depots = stmt
            .query_map([], |row| {
                Ok(Depot {
                    depot_id: row.get(0)?,
                    depot_name: row.get(1)?,
                    depot_code: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(depots)
    }

    async fn list_active_buses(&self, depot_id: &str) -> RepositoryResult<Vec<Bus>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT bus_id, bus_number, depot_id, capacity, is_ac, is_sleeper, status,
                   current_route_id, current_route_name, current_route_assigned_at, revision
            FROM bus
            WHERE depot_id = ?1 AND status = 'active'
            ORDER BY bus_id
            "#,
        )?;
        let buses = stmt
            .query_map(params![depot_id], map_bus)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(buses)
    }

    async fn list_active_routes(&self, depot_id: &str) -> RepositoryResult<Vec<Route>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT route_id, route_number, route_name, depot_id,
                   total_distance_km, base_fare, requires_ac, revision
            FROM route
            WHERE depot_id = ?1 AND status = 'active' AND is_active = 1
            ORDER BY route_id
            "#,
        )?;
        let mut routes = stmt
            .query_map(params![depot_id], |row| {
                Ok(Route {
                    route_id: row.get(0)?,
                    route_number: row.get(1)?,
                    route_name: row.get(2)?,
                    depot_id: row.get(3)?,
                    total_distance_km: row.get(4)?,
                    base_fare: row.get(5)?,
                    requires_ac: row.get(6)?,
                    schedules: Vec::new(),
                    assigned_buses: Vec::new(),
                    revision: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for route in &mut routes {
            route.schedules = Self::load_schedules(&conn, &route.route_id)?;
            route.assigned_buses = Self::load_assigned_buses(&conn, &route.route_id)?;
        }
        Ok(routes)
    }

    async fn list_trips(
        &self,
        route_id: &str,
        range: DateRange,
        statuses: &[TripStatus],
    ) -> RepositoryResult<Vec<Trip>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (0..statuses.len())
            .map(|i| format!("?{}", i + 4))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r#"
            SELECT trip_id, route_id, bus_id, service_date, departure_time, arrival_time,
                   status, capacity, booked_seats, fare
            FROM trip
            WHERE route_id = ?1 AND service_date >= ?2 AND service_date <= ?3
              AND status IN ({})
            ORDER BY service_date, departure_time, trip_id
            "#,
            placeholders
        );

        let mut values: Vec<String> = vec![
            route_id.to_string(),
            range.start.format(DATE_FORMAT).to_string(),
            range.end.format(DATE_FORMAT).to_string(),
        ];
        values.extend(statuses.iter().map(|s| s.to_db_str().to_string()));

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let trips = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(Trip {
                    trip_id: row.get(0)?,
                    route_id: row.get(1)?,
                    bus_id: row.get(2)?,
                    service_date: parse_date(row, 3)?,
                    departure_time: parse_time(row, 4)?,
                    arrival_time: parse_time(row, 5)?,
                    status: TripStatus::from_str(&row.get::<_, String>(6)?),
                    capacity: row.get(7)?,
                    booked_seats: row.get(8)?,
                    fare: row.get(9)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(trips)
    }

    async fn count_active_buses(&self) -> RepositoryResult<usize> {
        self.count("SELECT COUNT(*) FROM bus WHERE status = 'active'", &[])
    }

    async fn count_active_routes(&self) -> RepositoryResult<usize> {
        self.count(
            "SELECT COUNT(*) FROM route WHERE status = 'active' AND is_active = 1",
            &[],
        )
    }

    async fn count_depots(&self) -> RepositoryResult<usize> {
        self.count("SELECT COUNT(*) FROM depot", &[])
    }

    async fn count_active_staff(&self, role: StaffRole) -> RepositoryResult<usize> {
        self.count(
            "SELECT COUNT(*) FROM staff WHERE role = ?1 AND status = 'active'",
            &[&role.to_db_str() as &dyn rusqlite::ToSql],
        )
    }

    async fn count_buses_without_depot(&self) -> RepositoryResult<usize> {
        self.count(
            "SELECT COUNT(*) FROM bus WHERE status = 'active' AND (depot_id IS NULL OR depot_id = '')",
            &[],
        )
    }

    async fn update_route_assignment(
        &self,
        route_id: &str,
        buses: &[AssignedBus],
        expected_revision: i64,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let rows_affected = tx.execute(
            "UPDATE route SET revision = revision + 1 WHERE route_id = ?1 AND revision = ?2",
            params![route_id, expected_revision],
        )?;
        if rows_affected == 0 {
            return Err(Self::revision_conflict(
                &tx,
                "route",
                "route_id",
                "Route",
                route_id,
                expected_revision,
            ));
        }

        tx.execute(
            "DELETE FROM route_assigned_bus WHERE route_id = ?1",
            params![route_id],
        )?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO route_assigned_bus (route_id, bus_id, bus_number, capacity, assigned_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for bus in buses {
                stmt.execute(params![
                    route_id,
                    bus.bus_id,
                    bus.bus_number,
                    bus.capacity,
                    bus.assigned_at.to_rfc3339(),
                ])?;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    async fn update_bus_current_route(
        &self,
        bus_id: &str,
        route: Option<&CurrentRoute>,
        expected_revision: i64,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows_affected = conn.execute(
            r#"
            UPDATE bus
            SET current_route_id = ?1, current_route_name = ?2, current_route_assigned_at = ?3,
                revision = revision + 1
            WHERE bus_id = ?4 AND revision = ?5
            "#,
            params![
                route.map(|r| r.route_id.as_str()),
                route.map(|r| r.route_name.as_str()),
                route.map(|r| r.assigned_at.to_rfc3339()),
                bus_id,
                expected_revision,
            ],
        )?;

        if rows_affected == 0 {
            return Err(Self::revision_conflict(
                &conn,
                "bus",
                "bus_id",
                "Bus",
                bus_id,
                expected_revision,
            ));
        }
        Ok(())
    }

    async fn insert_trips(&self, trips: &[Trip]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO trip (
                    trip_id, route_id, bus_id, service_date, departure_time, arrival_time,
                    status, capacity, booked_seats, fare
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )?;
            for trip in trips {
                inserted += stmt.execute(params![
                    trip.trip_id,
                    trip.route_id,
                    trip.bus_id,
                    trip.service_date.format(DATE_FORMAT).to_string(),
                    trip.departure_time.format(TIME_FORMAT).to_string(),
                    trip.arrival_time.format(TIME_FORMAT).to_string(),
                    trip.status.to_db_str(),
                    trip.capacity,
                    trip.booked_seats,
                    trip.fare,
                ])?;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn setup() -> SqliteFleetRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO depot (depot_id, depot_name) VALUES ('D1', 'Central');
            INSERT INTO bus (bus_id, bus_number, depot_id, capacity, is_ac) VALUES ('B1', 'KL-01', 'D1', 45, 1);
            INSERT INTO bus (bus_id, bus_number, depot_id, capacity, status) VALUES ('B2', 'KL-02', 'D1', 40, 'maintenance');
            INSERT INTO bus (bus_id, bus_number, capacity) VALUES ('B3', 'KL-03', 40);
            INSERT INTO route (route_id, route_number, route_name, depot_id, total_distance_km, base_fare)
                VALUES ('R1', '101', 'City Loop', 'D1', 120.0, 20.0);
            INSERT INTO route_schedule (schedule_id, route_id, departure_time, arrival_time) VALUES ('S1', 'R1', '08:00', '10:00');
            INSERT INTO route_schedule (schedule_id, route_id, departure_time, arrival_time, is_active) VALUES ('S2', 'R1', '12:00', '14:00', 0);
            INSERT INTO trip (trip_id, route_id, bus_id, service_date, departure_time, arrival_time, status, capacity, booked_seats, fare)
                VALUES ('T1', 'R1', 'B1', '2025-03-01', '08:00', '10:00', 'completed', 45, 30, 20.0);
            INSERT INTO trip (trip_id, route_id, bus_id, service_date, departure_time, arrival_time, status, capacity, booked_seats, fare)
                VALUES ('T2', 'R1', 'B1', '2025-03-02', '08:00', '10:00', 'cancelled', 45, 0, 20.0);
            INSERT INTO trip (trip_id, route_id, bus_id, service_date, departure_time, arrival_time, status, capacity, booked_seats, fare)
                VALUES ('T3', 'R1', 'B1', '2025-04-01', '08:00', '10:00', 'completed', 45, 10, 20.0);
            "#,
        )
        .unwrap();
        SqliteFleetRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_list_reads_filter_status() {
        let repo = setup();
        let buses = repo.list_active_buses("D1").await.unwrap();
        assert_eq!(buses.len(), 1);
        assert!(buses[0].is_ac);

        let routes = repo.list_active_routes("D1").await.unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].schedules.len(), 1);

        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        )
        .unwrap();
        let trips = repo.list_trips("R1", range, &TripStatus::HISTORY).await.unwrap();
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].trip_id, "T1");

        assert_eq!(repo.count_active_buses().await.unwrap(), 2);
        assert_eq!(repo.count_buses_without_depot().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bus_update_rejects_stale_revision() {
        let repo = setup();
        let route = CurrentRoute {
            route_id: "R1".to_string(),
            route_name: "City Loop".to_string(),
            assigned_at: Utc::now(),
        };

        repo.update_bus_current_route("B1", Some(&route), 0).await.unwrap();

        let err = repo
            .update_bus_current_route("B1", Some(&route), 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::OptimisticLockFailure { expected: 0, actual: 1, .. }
        ));

        let err = repo
            .update_bus_current_route("NOPE", Some(&route), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));

        let buses = repo.list_active_buses("D1").await.unwrap();
        assert_eq!(buses[0].current_route_id(), Some("R1"));
        assert_eq!(buses[0].revision, 1);
    }

    #[tokio::test]
    async fn test_route_assignment_overwrites_list() {
        let repo = setup();
        let assigned = |id: &str| AssignedBus {
            bus_id: id.to_string(),
            bus_number: format!("KL-{}", id),
            capacity: 45,
            assigned_at: Utc::now(),
        };

        repo.update_route_assignment("R1", &[assigned("B1"), assigned("B9")], 0)
            .await
            .unwrap();
        repo.update_route_assignment("R1", &[assigned("B1")], 1)
            .await
            .unwrap();

        let routes = repo.list_active_routes("D1").await.unwrap();
        assert_eq!(routes[0].assigned_buses.len(), 1);
        assert_eq!(routes[0].revision, 2);
    }
}
