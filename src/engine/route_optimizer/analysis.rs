// ==========================================
// 车队排班系统 - 线路绩效分析
// ==========================================
// 输入: 线路 + 区间内已完成/运行中车次
// 输出: RouteAnalysis（效率/需求评分 + 建议）
// 红线: 纯函数，相同车次历史必须得到完全相同的结果
// ==========================================

use crate::config::OptimizationRules;
use crate::domain::analysis::RouteAnalysis;
use crate::domain::fleet::{Route, Trip};
use crate::domain::score::{ScoreError, UnitScore};
use crate::domain::types::RouteRecommendation;

// ===== 权重 =====
const EFFICIENCY_DISTANCE_WEIGHT: f64 = 0.3;
const EFFICIENCY_TIME_WEIGHT: f64 = 0.3;
const EFFICIENCY_OCCUPANCY_WEIGHT: f64 = 0.4;

const DEMAND_OCCUPANCY_WEIGHT: f64 = 0.5;
const DEMAND_FREQUENCY_WEIGHT: f64 = 0.3;
const DEMAND_REVENUE_WEIGHT: f64 = 0.2;

/// 分析单条线路
///
/// 无车次 → 全零指标 + INACTIVE（无历史视为停运，而非未知）
pub fn analyze_trips(
    route: &Route,
    trips: &[Trip],
    rules: &OptimizationRules,
) -> Result<RouteAnalysis, ScoreError> {
    if trips.is_empty() {
        return Ok(RouteAnalysis::inactive(&route.route_id, &route.route_name));
    }

    let n = trips.len() as f64;
    let average_occupancy = UnitScore::new(trips.iter().map(Trip::occupancy).sum::<f64>() / n)?;
    let revenue: f64 = trips.iter().map(Trip::revenue).sum();
    let average_duration = trips.iter().map(Trip::duration_hours).sum::<f64>() / n;
    let average_fare = trips.iter().map(|t| t.fare).sum::<f64>() / n;

    // 效率: 距离 / 时长 / 上座率
    let distance_score =
        UnitScore::new((1.0 - route.total_distance_km / rules.max_route_distance_km).max(0.0))?;
    let time_score =
        UnitScore::new((1.0 - average_duration / rules.max_route_duration_hours).max(0.0))?;
    let efficiency = UnitScore::weighted(&[
        (EFFICIENCY_DISTANCE_WEIGHT, distance_score),
        (EFFICIENCY_TIME_WEIGHT, time_score),
        (EFFICIENCY_OCCUPANCY_WEIGHT, average_occupancy),
    ])?;

    // 需求: 上座率 / 频次 / 票价
    let frequency_score = UnitScore::new((n / rules.frequency_normalizer_trips).min(1.0))?;
    let revenue_score = UnitScore::new((average_fare / rules.revenue_normalizer_fare).min(1.0))?;
    let demand = UnitScore::weighted(&[
        (DEMAND_OCCUPANCY_WEIGHT, average_occupancy),
        (DEMAND_FREQUENCY_WEIGHT, frequency_score),
        (DEMAND_REVENUE_WEIGHT, revenue_score),
    ])?;

    Ok(RouteAnalysis {
        route_id: route.route_id.clone(),
        route_name: route.route_name.clone(),
        total_trips: trips.len(),
        average_occupancy,
        revenue,
        efficiency,
        demand,
        recommendation: classify_route(average_occupancy, efficiency, demand),
    })
}

/// 线路建议分类
///
/// 按顺序判定，首个命中即返回
pub fn classify_route(
    occupancy: UnitScore,
    efficiency: UnitScore,
    demand: UnitScore,
) -> RouteRecommendation {
    let (occ, eff, dem) = (occupancy.value(), efficiency.value(), demand.value());

    if occ < 0.3 && eff < 0.4 {
        RouteRecommendation::Inactive
    } else if occ < 0.5 || eff < 0.6 {
        RouteRecommendation::ReduceFrequency
    } else if occ > 0.8 && eff > 0.7 {
        RouteRecommendation::IncreaseFrequency
    } else if dem > 0.8 {
        RouteRecommendation::AddBuses
    } else {
        RouteRecommendation::Maintain
    }
}
