// ==========================================
// 车队排班系统 - 车辆-线路分配
// ==========================================
// 输入: 车场可用车辆 + 启用线路 + 线路分析
// 输出: 最终分配方案（未达最低车辆数的线路被静默丢弃）
// 红线: INACTIVE 线路永不分配车辆
// 红线: busesNeeded ∈ [1, max_buses_per_route]
// ==========================================

use crate::config::OptimizationRules;
use crate::domain::analysis::{Assignment, BusAssignment, RouteAnalysis};
use crate::domain::fleet::{Bus, Route};
use crate::domain::score::{ScoreError, UnitScore};
use crate::domain::types::RouteRecommendation;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::debug;

// ===== 兼容度加分 =====
const COMPAT_BASE: f64 = 0.5;
const COMPAT_CAPACITY_BONUS: f64 = 0.2;
const COMPAT_AC_BONUS: f64 = 0.2;
const COMPAT_SLEEPER_BONUS: f64 = 0.1;

// ===== 优化评分权重 =====
const OPT_UTILIZATION_WEIGHT: f64 = 0.4;
const OPT_EFFICIENCY_WEIGHT: f64 = 0.3;
const OPT_COMPATIBILITY_WEIGHT: f64 = 0.3;

/// 计算线路所需车辆数
///
/// base(班次数, 至少 1) × ceil(demand × 2) × (长线路 ? 2 : 1)，再夹到 [1, max]
pub fn buses_needed(route: &Route, analysis: &RouteAnalysis, rules: &OptimizationRules) -> u32 {
    let base = route.base_frequency();
    let demand_multiplier = (analysis.demand.value() * 2.0).ceil() as u32;
    let distance_multiplier = if route.total_distance_km > rules.long_route_distance_km {
        2
    } else {
        1
    };

    base.saturating_mul(demand_multiplier)
        .saturating_mul(distance_multiplier)
        .clamp(1, rules.max_buses_per_route.max(1))
}

/// 车辆是否可服务线路
///
/// - 座位数 ≥ min_bus_capacity
/// - 空调线路必须是空调车
/// - 已挂在其他线路上的车辆排除
pub fn is_bus_compatible(bus: &Bus, route: &Route, rules: &OptimizationRules) -> bool {
    if bus.capacity < rules.min_bus_capacity {
        return false;
    }
    if route.requires_ac && !bus.is_ac {
        return false;
    }
    match bus.current_route_id() {
        Some(current) => current == route.route_id,
        None => true,
    }
}

/// 车辆-线路兼容度 (上限 1)
pub fn compatibility_score(
    bus: &Bus,
    route: &Route,
    rules: &OptimizationRules,
) -> Result<UnitScore, ScoreError> {
    let mut score = COMPAT_BASE;

    // 座位余量（粗略按票价的两倍估算）
    if f64::from(bus.capacity) >= route.base_fare * 2.0 {
        score += COMPAT_CAPACITY_BONUS;
    }
    if route.requires_ac && bus.is_ac {
        score += COMPAT_AC_BONUS;
    }
    if route.total_distance_km > rules.long_route_distance_km && bus.is_sleeper {
        score += COMPAT_SLEEPER_BONUS;
    }

    UnitScore::new(score.min(1.0))
}

/// 分配方案评分
///
/// 0.4·(demand / 车辆数) + 0.3·efficiency + 0.3·mean(兼容度)
pub fn optimization_score(
    analysis: &RouteAnalysis,
    buses: &[BusAssignment],
) -> Result<UnitScore, ScoreError> {
    if buses.is_empty() {
        return Ok(UnitScore::ZERO);
    }
    let n = buses.len() as f64;
    let utilization = UnitScore::new(analysis.demand.value() / n)?;
    let compatibility =
        UnitScore::new(buses.iter().map(|b| b.compatibility.value()).sum::<f64>() / n)?;

    UnitScore::weighted(&[
        (OPT_UTILIZATION_WEIGHT, utilization),
        (OPT_EFFICIENCY_WEIGHT, analysis.efficiency),
        (OPT_COMPATIBILITY_WEIGHT, compatibility),
    ])
}

/// 贪心计算分配方案
///
/// 线路按 (demand + efficiency) 降序（稳定排序），车辆按座位数降序、空调优先；
/// 每条线路依次取第一辆未被占用且兼容的车辆。
pub fn calculate_assignments(
    buses: &[Bus],
    routes: &[Route],
    analyses: &HashMap<String, RouteAnalysis>,
    rules: &OptimizationRules,
) -> Result<Vec<Assignment>, ScoreError> {
    let mut sorted_routes: Vec<(&Route, &RouteAnalysis)> = routes
        .iter()
        .filter_map(|r| analyses.get(&r.route_id).map(|a| (r, a)))
        .filter(|(_, a)| a.recommendation != RouteRecommendation::Inactive)
        .collect();
    sorted_routes.sort_by(|(_, a), (_, b)| {
        b.priority()
            .partial_cmp(&a.priority())
            .unwrap_or(Ordering::Equal)
    });

    let mut sorted_buses: Vec<&Bus> = buses.iter().collect();
    sorted_buses.sort_by(|a, b| {
        b.capacity
            .cmp(&a.capacity)
            .then_with(|| b.is_ac.cmp(&a.is_ac))
    });

    let mut taken: HashSet<&str> = HashSet::new();
    let mut assignments = Vec::new();

    for (route, analysis) in sorted_routes {
        let needed = buses_needed(route, analysis, rules) as usize;
        let mut picked: Vec<BusAssignment> = Vec::with_capacity(needed);

        for bus in sorted_buses.iter() {
            if picked.len() >= needed {
                break;
            }
            if taken.contains(bus.bus_id.as_str()) || !is_bus_compatible(bus, route, rules) {
                continue;
            }
            picked.push(BusAssignment {
                bus_id: bus.bus_id.clone(),
                bus_number: bus.bus_number.clone(),
                capacity: bus.capacity,
                expected_revision: bus.revision,
                compatibility: compatibility_score(bus, route, rules)?,
            });
            taken.insert(bus.bus_id.as_str());
        }

        if picked.len() < rules.min_buses_per_route as usize {
            debug!(
                route_id = %route.route_id,
                needed = needed,
                found = picked.len(),
                "可用车辆不足，放弃线路分配"
            );
            // 已挑选的车辆本轮不再参与其他线路
            continue;
        }

        assignments.push(Assignment {
            route_id: route.route_id.clone(),
            route_name: route.route_name.clone(),
            route_revision: route.revision,
            optimization_score: optimization_score(analysis, &picked)?,
            buses: picked,
            analysis: analysis.clone(),
        });
    }

    Ok(assignments)
}
