// ==========================================
// 车队排班系统 - 车次生成器
// ==========================================
// 职责: 根据车辆当前线路 + 线路启用班次，生成日期范围内的计划车次
// 约束: 编排器只消费汇总计数，将生成器视为可能缓慢、可能失败的黑盒
// ==========================================

use crate::config::TripGenerationRules;
use crate::domain::fleet::{DateRange, Route, Trip};
use crate::domain::types::TripStatus;
use crate::repository::FleetRepository;
use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// 生成选项
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    /// 仅处理该车场；None 表示全部车场
    pub depot_id: Option<String>,
    /// 本次调用的每车每日班次上限；None 时使用配置值
    pub max_daily_trips: Option<u32>,
}

impl GenerationOptions {
    /// 保留调用方选项，仅替换车场
    pub fn scoped_to(&self, depot_id: &str) -> Self {
        Self {
            depot_id: Some(depot_id.to_string()),
            ..self.clone()
        }
    }
}

/// 生成结果汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    pub scheduled_buses: usize,
    pub failed_buses: usize,
    pub total_trips: usize,
}

// ==========================================
// TripGenerator Trait
// ==========================================
#[async_trait]
pub trait TripGenerator: Send + Sync {
    /// 为 [start, end] 生成车次
    async fn generate(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        options: &GenerationOptions,
    ) -> anyhow::Result<GenerationSummary>;
}

// ==========================================
// AssignedRouteTripGenerator - 按已分配线路生成
// ==========================================
// 每辆车每天取线路前 max_bus_daily_trips 个班次；
// 无当前线路或线路无启用班次的车辆计为失败。
pub struct AssignedRouteTripGenerator<R: FleetRepository + ?Sized> {
    repo: Arc<R>,
    rules: TripGenerationRules,
}

impl<R: FleetRepository + ?Sized> AssignedRouteTripGenerator<R> {
    pub fn new(repo: Arc<R>, rules: TripGenerationRules) -> Self {
        Self { repo, rules }
    }

    fn plan_bus_trips(
        bus_id: &str,
        capacity: u32,
        route: &Route,
        range: DateRange,
        daily: usize,
    ) -> Vec<Trip> {
        range
            .days()
            .flat_map(|day| {
                route.schedules.iter().take(daily).map(move |slot| Trip {
                    trip_id: Uuid::new_v4().to_string(),
                    route_id: route.route_id.clone(),
                    bus_id: bus_id.to_string(),
                    service_date: day,
                    departure_time: slot.departure_time,
                    arrival_time: slot.arrival_time,
                    status: TripStatus::Scheduled,
                    capacity,
                    booked_seats: 0,
                    fare: route.base_fare,
                })
            })
            .collect()
    }

    async fn generate_for_depot(
        &self,
        depot_id: &str,
        range: DateRange,
        daily: usize,
    ) -> anyhow::Result<GenerationSummary> {
        let buses = self
            .repo
            .list_active_buses(depot_id)
            .await
            .with_context(|| format!("读取车场车辆失败: {}", depot_id))?;
        let routes: HashMap<String, Route> = self
            .repo
            .list_active_routes(depot_id)
            .await
            .with_context(|| format!("读取车场线路失败: {}", depot_id))?
            .into_iter()
            .map(|r| (r.route_id.clone(), r))
            .collect();

        let mut summary = GenerationSummary::default();
        let mut planned = Vec::new();

        for bus in &buses {
            let route = bus
                .current_route_id()
                .and_then(|id| routes.get(id))
                .filter(|r| !r.schedules.is_empty());
            match route {
                Some(route) => {
                    planned.extend(Self::plan_bus_trips(&bus.bus_id, bus.capacity, route, range, daily));
                    summary.scheduled_buses += 1;
                }
                None => {
                    debug!(bus_id = %bus.bus_id, "车辆无可用线路班次，跳过");
                    summary.failed_buses += 1;
                }
            }
        }

        let inserted = self
            .repo
            .insert_trips(&planned)
            .await
            .with_context(|| format!("写入车次失败: {}", depot_id))?;
        summary.total_trips = planned.len();

        info!(
            depot_id = %depot_id,
            scheduled_buses = summary.scheduled_buses,
            failed_buses = summary.failed_buses,
            planned_trips = planned.len(),
            inserted_trips = inserted,
            "车场车次生成完成"
        );
        Ok(summary)
    }
}

#[async_trait]
impl<R: FleetRepository + ?Sized> TripGenerator for AssignedRouteTripGenerator<R> {
    #[instrument(skip(self), fields(depot_id = ?options.depot_id))]
    async fn generate(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        options: &GenerationOptions,
    ) -> anyhow::Result<GenerationSummary> {
        let range = DateRange::new(start, end)
            .with_context(|| format!("日期范围无效: {} > {}", start, end))?;
        let daily: u32 = match options.max_daily_trips {
            Some(0) => anyhow::bail!("每日班次上限必须大于 0"),
            Some(n) => n.min(self.rules.max_bus_daily_trips),
            None => self.rules.max_bus_daily_trips,
        };

        let depot_ids: Vec<String> = match &options.depot_id {
            Some(id) => vec![id.clone()],
            None => self
                .repo
                .list_depots()
                .await?
                .into_iter()
                .map(|d| d.depot_id)
                .collect(),
        };

        let mut total = GenerationSummary::default();
        for depot_id in &depot_ids {
            let s = self.generate_for_depot(depot_id, range, daily as usize).await?;
            total.scheduled_buses += s.scheduled_buses;
            total.failed_buses += s.failed_buses;
            total.total_trips += s.total_trips;
        }
        Ok(total)
    }
}
