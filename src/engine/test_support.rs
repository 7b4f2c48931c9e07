// ==========================================
// 引擎层单元测试 - 内存仓储与数据构造
// ==========================================

use crate::domain::fleet::{AssignedBus, Bus, CurrentRoute, DateRange, Depot, Route, RouteSchedule, Trip};
use crate::domain::types::{StaffRole, TripStatus};
use crate::repository::{FleetRepository, RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use std::collections::HashSet;
use std::sync::Mutex;

// ==========================================
// MockFleetRepository - 内存仓储
// ==========================================
#[derive(Default)]
pub struct MockFleetRepository {
    pub depots: Vec<Depot>,
    pub buses: Mutex<Vec<Bus>>,
    pub routes: Mutex<Vec<Route>>,
    pub trips: Mutex<Vec<Trip>>,
    pub drivers: usize,
    pub conductors: usize,
    /// 写回时注入失败的线路
    pub failing_routes: HashSet<String>,
    /// 读取线路时注入失败的车场
    pub failing_depots: HashSet<String>,
    /// 计数查询注入失败
    pub failing_counts: bool,
}

impl MockFleetRepository {
    pub fn route(&self, route_id: &str) -> Option<Route> {
        self.routes
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.route_id == route_id)
            .cloned()
    }

    pub fn bus(&self, bus_id: &str) -> Option<Bus> {
        self.buses
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.bus_id == bus_id)
            .cloned()
    }
}

#[async_trait]
impl FleetRepository for MockFleetRepository {
    async fn list_depots(&self) -> RepositoryResult<Vec<Depot>> {
        Ok(self.depots.clone())
    }

    async fn list_active_buses(&self, depot_id: &str) -> RepositoryResult<Vec<Bus>> {
        Ok(self
            .buses
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.depot_id.as_deref() == Some(depot_id))
            .cloned()
            .collect())
    }

    async fn list_active_routes(&self, depot_id: &str) -> RepositoryResult<Vec<Route>> {
        if self.failing_depots.contains(depot_id) {
            return Err(RepositoryError::DatabaseQueryError(format!(
                "route table unavailable for {}",
                depot_id
            )));
        }
        Ok(self
            .routes
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.depot_id == depot_id)
            .cloned()
            .collect())
    }

    async fn list_trips(
        &self,
        route_id: &str,
        range: DateRange,
        statuses: &[TripStatus],
    ) -> RepositoryResult<Vec<Trip>> {
        Ok(self
            .trips
            .lock()
            .unwrap()
            .iter()
            .filter(|t| {
                t.route_id == route_id
                    && range.contains(t.service_date)
                    && statuses.contains(&t.status)
            })
            .cloned()
            .collect())
    }

    async fn count_active_buses(&self) -> RepositoryResult<usize> {
        Ok(self.buses.lock().unwrap().len())
    }

    async fn count_active_routes(&self) -> RepositoryResult<usize> {
        if self.failing_counts {
            return Err(RepositoryError::DatabaseQueryError("database is locked".to_string()));
        }
        Ok(self.routes.lock().unwrap().len())
    }

    async fn count_depots(&self) -> RepositoryResult<usize> {
        Ok(self.depots.len())
    }

    async fn count_active_staff(&self, role: StaffRole) -> RepositoryResult<usize> {
        Ok(match role {
            StaffRole::Driver => self.drivers,
            StaffRole::Conductor => self.conductors,
        })
    }

    async fn count_buses_without_depot(&self) -> RepositoryResult<usize> {
        Ok(self
            .buses
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.depot_id.is_none())
            .count())
    }

    async fn update_route_assignment(
        &self,
        route_id: &str,
        buses: &[AssignedBus],
        expected_revision: i64,
    ) -> RepositoryResult<()> {
        if self.failing_routes.contains(route_id) {
            return Err(RepositoryError::DatabaseQueryError(format!(
                "write rejected for {}",
                route_id
            )));
        }
        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .find(|r| r.route_id == route_id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Route".to_string(),
                id: route_id.to_string(),
            })?;
        if route.revision != expected_revision {
            return Err(RepositoryError::OptimisticLockFailure {
                entity: "Route".to_string(),
                id: route_id.to_string(),
                expected: expected_revision,
                actual: route.revision,
            });
        }
        route.assigned_buses = buses.to_vec();
        route.revision += 1;
        Ok(())
    }

    async fn update_bus_current_route(
        &self,
        bus_id: &str,
        route: Option<&CurrentRoute>,
        expected_revision: i64,
    ) -> RepositoryResult<()> {
        let mut buses = self.buses.lock().unwrap();
        let bus = buses
            .iter_mut()
            .find(|b| b.bus_id == bus_id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Bus".to_string(),
                id: bus_id.to_string(),
            })?;
        if bus.revision != expected_revision {
            return Err(RepositoryError::OptimisticLockFailure {
                entity: "Bus".to_string(),
                id: bus_id.to_string(),
                expected: expected_revision,
                actual: bus.revision,
            });
        }
        bus.current_route = route.cloned();
        bus.revision += 1;
        Ok(())
    }

    async fn insert_trips(&self, trips: &[Trip]) -> RepositoryResult<usize> {
        let mut stored = self.trips.lock().unwrap();
        let mut inserted = 0;
        for trip in trips {
            let duplicate = stored.iter().any(|t| {
                t.route_id == trip.route_id
                    && t.bus_id == trip.bus_id
                    && t.service_date == trip.service_date
                    && t.departure_time == trip.departure_time
            });
            if !duplicate {
                stored.push(trip.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

// ==========================================
// 数据构造
// ==========================================

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn depot(id: &str) -> Depot {
    Depot {
        depot_id: id.to_string(),
        depot_name: format!("Depot {}", id),
        depot_code: None,
    }
}

pub fn bus(id: &str, depot_id: &str, capacity: u32, is_ac: bool) -> Bus {
    Bus {
        bus_id: id.to_string(),
        bus_number: format!("KL-{}", id),
        depot_id: Some(depot_id.to_string()),
        capacity,
        is_ac,
        is_sleeper: false,
        current_route: None,
        revision: 0,
    }
}

/// 线路（slots 个启用班次，08:00 起每 2 小时一班，单程 2 小时）
pub fn route(id: &str, depot_id: &str, distance_km: f64, slots: usize) -> Route {
    Route {
        route_id: id.to_string(),
        route_number: id.to_string(),
        route_name: format!("Route {}", id),
        depot_id: depot_id.to_string(),
        total_distance_km: distance_km,
        base_fare: 20.0,
        requires_ac: false,
        schedules: (0..slots)
            .map(|i| RouteSchedule {
                schedule_id: format!("{}-S{}", id, i),
                departure_time: time(8 + 2 * i as u32, 0),
                arrival_time: time(10 + 2 * i as u32, 0),
            })
            .collect(),
        assigned_buses: Vec::new(),
        revision: 0,
    }
}

/// 已完成车次（2 小时）
pub fn trip(route_id: &str, day: NaiveDate, capacity: u32, booked: u32, fare: f64) -> Trip {
    Trip {
        trip_id: format!("{}-{}-{}", route_id, day, booked),
        route_id: route_id.to_string(),
        bus_id: "B-HIST".to_string(),
        service_date: day,
        departure_time: time(8, 0),
        arrival_time: time(10, 0),
        status: TripStatus::Completed,
        capacity,
        booked_seats: booked,
        fare,
    }
}
