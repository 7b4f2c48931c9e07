// ==========================================
// 车队排班系统 - 线路分析与分配结果模型
// ==========================================
// 职责: 线路绩效分析 / 车辆-线路分配 / 优化结果 (均为派生数据，不持久化)
// ==========================================

use crate::domain::score::UnitScore;
use crate::domain::types::RouteRecommendation;
use serde::{Deserialize, Serialize};

// ==========================================
// RouteAnalysis - 线路绩效分析
// ==========================================
// 每次优化重新计算，是区间内车次历史的纯函数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteAnalysis {
    pub route_id: String,
    pub route_name: String,
    pub total_trips: usize,
    pub average_occupancy: UnitScore,
    pub revenue: f64,
    pub efficiency: UnitScore,
    pub demand: UnitScore,
    pub recommendation: RouteRecommendation,
}

impl RouteAnalysis {
    /// 无历史车次的线路：全零指标，直接判为停运
    pub fn inactive(route_id: &str, route_name: &str) -> Self {
        Self {
            route_id: route_id.to_string(),
            route_name: route_name.to_string(),
            total_trips: 0,
            average_occupancy: UnitScore::ZERO,
            revenue: 0.0,
            efficiency: UnitScore::ZERO,
            demand: UnitScore::ZERO,
            recommendation: RouteRecommendation::Inactive,
        }
    }

    /// 线路优先级 (需求 + 效率)
    pub fn priority(&self) -> f64 {
        self.demand.value() + self.efficiency.value()
    }
}

// ==========================================
// BusAssignment / Assignment - 分配方案
// ==========================================

/// 单车分配
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusAssignment {
    pub bus_id: String,
    pub bus_number: String,
    pub capacity: u32,
    pub expected_revision: i64, // 读取时的车辆版本号（写回时校验）
    pub compatibility: UnitScore,
}

/// 线路分配方案（仅存在于一次优化过程中）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub route_id: String,
    pub route_name: String,
    pub route_revision: i64,
    pub buses: Vec<BusAssignment>,
    pub optimization_score: UnitScore,
    pub analysis: RouteAnalysis,
}

// ==========================================
// OptimizationOutcome - 单车场优化结果
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationOutcome {
    pub depot_id: String,
    pub optimized_routes: usize,
    pub total_optimizations: usize, // 已写回的车辆分配数
    pub failed_routes: Vec<RouteApplyFailure>,
    pub assignments: Vec<Assignment>,
}

/// 单线路写回失败记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteApplyFailure {
    pub route_id: String,
    pub route_name: String,
    pub reason: String,
}

// ==========================================
// RouteOptimizationReport - 车场线路优化报告
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOptimizationReport {
    pub depot_id: String,
    pub summary: RouteOptimizationSummary,
    pub routes: Vec<RouteAnalysis>, // 按效率降序
    pub top_performers: Vec<RouteAnalysis>,
    pub under_performers: Vec<RouteAnalysis>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOptimizationSummary {
    pub total_routes: usize,
    pub active_routes: usize,
    pub inactive_routes: usize,
    pub average_efficiency: f64,
    pub average_demand: f64,
}
