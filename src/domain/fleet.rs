// ==========================================
// 车队排班系统 - 车队领域模型
// ==========================================
// 职责: 车场 / 车辆 / 线路 / 车次 实体定义
// 红线: 实体只读传递，写回必须经由 FleetRepository 显式接口
// ==========================================

use crate::domain::types::TripStatus;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Depot - 车场
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Depot {
    pub depot_id: String,
    pub depot_name: String,
    pub depot_code: Option<String>,
}

// ==========================================
// Bus - 车辆
// ==========================================
// 不变量: 任一时刻至多一条当前线路 (current_route: Option)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub bus_id: String,
    pub bus_number: String,
    pub depot_id: Option<String>,
    pub capacity: u32,   // 总座位数
    pub is_ac: bool,     // 空调车
    pub is_sleeper: bool, // 卧铺车
    pub current_route: Option<CurrentRoute>,
    pub revision: i64, // 乐观锁版本号
}

impl Bus {
    /// 当前线路ID（若已分配）
    pub fn current_route_id(&self) -> Option<&str> {
        self.current_route.as_ref().map(|r| r.route_id.as_str())
    }
}

/// 车辆当前线路引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentRoute {
    pub route_id: String,
    pub route_name: String,
    pub assigned_at: DateTime<Utc>,
}

// ==========================================
// Route - 线路
// ==========================================
// 不变量: assigned_buses.len() <= max_buses_per_route（由分配算法保证，存储层不校验）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub route_id: String,
    pub route_number: String,
    pub route_name: String,
    pub depot_id: String,
    pub total_distance_km: f64,
    pub base_fare: f64,
    pub requires_ac: bool,
    pub schedules: Vec<RouteSchedule>, // 仅启用的班次
    pub assigned_buses: Vec<AssignedBus>,
    pub revision: i64, // 乐观锁版本号
}

impl Route {
    /// 班次数（至少按 1 计）
    pub fn base_frequency(&self) -> u32 {
        (self.schedules.len() as u32).max(1)
    }
}

/// 线路班次（发车/到达时刻）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSchedule {
    pub schedule_id: String,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
}

/// 线路已分配车辆
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedBus {
    pub bus_id: String,
    pub bus_number: String,
    pub capacity: u32,
    pub assigned_at: DateTime<Utc>,
}

// ==========================================
// Trip - 车次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub trip_id: String,
    pub route_id: String,
    pub bus_id: String,
    pub service_date: NaiveDate,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
    pub status: TripStatus,
    pub capacity: u32,
    pub booked_seats: u32,
    pub fare: f64,
}

impl Trip {
    /// 上座率（容量为 0 时为 0；超售按满座计）
    pub fn occupancy(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        (self.booked_seats as f64 / self.capacity as f64).min(1.0)
    }

    /// 运行时长（小时），跨零点按次日到达计算
    pub fn duration_hours(&self) -> f64 {
        let mut minutes = (self.arrival_time - self.departure_time).num_minutes();
        if minutes < 0 {
            minutes += 24 * 60;
        }
        minutes as f64 / 60.0
    }

    /// 车次收入
    pub fn revenue(&self) -> f64 {
        self.fare * self.booked_seats as f64
    }
}

// ==========================================
// DateRange - 闭区间日期范围
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// 构造日期范围
    ///
    /// # 返回
    /// - None: start > end
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// 单日范围
    pub fn single(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    /// 截止 end 的最近 days 天（含 end）
    ///
    /// # 返回
    /// - None: 起始日超出日历范围
    pub fn trailing(end: NaiveDate, days: u32) -> Option<Self> {
        let span = i64::from(days.max(1)) - 1;
        let start = end.checked_sub_signed(chrono::Duration::days(span))?;
        Some(Self { start, end })
    }

    /// 从 start 起连续 days 天（含 start）
    ///
    /// # 返回
    /// - None: days == 0 或结束日超出日历范围
    pub fn starting(start: NaiveDate, days: u32) -> Option<Self> {
        if days == 0 {
            return None;
        }
        let end = start.checked_add_signed(chrono::Duration::days(i64::from(days) - 1))?;
        Some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// 覆盖天数（含首尾）
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// 逐日迭代
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(dep: (u32, u32), arr: (u32, u32), capacity: u32, booked: u32) -> Trip {
        Trip {
            trip_id: "T1".to_string(),
            route_id: "R1".to_string(),
            bus_id: "B1".to_string(),
            service_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            departure_time: NaiveTime::from_hms_opt(dep.0, dep.1, 0).unwrap(),
            arrival_time: NaiveTime::from_hms_opt(arr.0, arr.1, 0).unwrap(),
            status: TripStatus::Completed,
            capacity,
            booked_seats: booked,
            fare: 100.0,
        }
    }

    #[test]
    fn test_trip_occupancy_edge_cases() {
        assert_eq!(trip((8, 0), (10, 0), 0, 10).occupancy(), 0.0);
        assert_eq!(trip((8, 0), (10, 0), 40, 20).occupancy(), 0.5);
        assert_eq!(trip((8, 0), (10, 0), 40, 50).occupancy(), 1.0);
    }

    #[test]
    fn test_trip_duration_wraps_midnight() {
        assert_eq!(trip((8, 0), (10, 30), 40, 0).duration_hours(), 2.5);
        assert_eq!(trip((22, 0), (2, 0), 40, 0).duration_hours(), 4.0);
    }

    #[test]
    fn test_date_range() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
        assert!(DateRange::new(d(5), d(1)).is_none());

        let range = DateRange::new(d(1), d(7)).unwrap();
        assert_eq!(range.span_days(), 7);
        assert_eq!(range.days().count(), 7);
        assert!(range.contains(d(7)));
        assert!(!range.contains(d(8)));

        let trailing = DateRange::trailing(d(30), 30).unwrap();
        assert_eq!(trailing.start, d(1));
        assert_eq!(DateRange::single(d(3)).span_days(), 1);

        let starting = DateRange::starting(d(1), 7).unwrap();
        assert_eq!(starting, range);
        assert!(DateRange::starting(d(1), 0).is_none());
    }

    #[test]
    fn test_date_range_out_of_calendar() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert!(DateRange::trailing(d, u32::MAX).is_none());
        assert!(DateRange::starting(d, u32::MAX).is_none());
        assert_eq!(DateRange::trailing(d, 0).unwrap(), DateRange::single(d));
    }
}
