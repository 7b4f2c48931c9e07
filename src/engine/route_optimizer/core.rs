// ==========================================
// 车队排班系统 - 线路优化引擎
// ==========================================
// 流程: 分析线路绩效 → 读取可用车辆/线路 → 计算分配 → 写回
// 输入: 车场ID + 分析区间
// 输出: OptimizationOutcome / RouteOptimizationReport
// ==========================================

use crate::config::{OptimizationRules, SchedulerConfig};
use crate::domain::analysis::{
    OptimizationOutcome, RouteAnalysis, RouteOptimizationReport, RouteOptimizationSummary,
};
use crate::domain::fleet::{DateRange, Route};
use crate::domain::types::TripStatus;
use crate::engine::error::OptimizerError;
use crate::repository::FleetRepository;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

use super::analysis::analyze_trips;
use super::apply::apply_assignments;
use super::assignment::calculate_assignments;

const REPORT_TOP_EFFICIENCY: f64 = 0.7;
const REPORT_UNDER_EFFICIENCY: f64 = 0.5;
const REPORT_RANKING_SIZE: usize = 5;

// ==========================================
// RouteOptimizer - 线路优化引擎
// ==========================================
pub struct RouteOptimizer<R: FleetRepository + ?Sized> {
    repo: Arc<R>,
    config: Arc<SchedulerConfig>,
}

impl<R: FleetRepository + ?Sized> Clone for RouteOptimizer<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            config: Arc::clone(&self.config),
        }
    }
}

impl<R: FleetRepository + ?Sized> RouteOptimizer<R> {
    pub fn new(repo: Arc<R>, config: Arc<SchedulerConfig>) -> Self {
        Self { repo, config }
    }

    fn rules(&self) -> &OptimizationRules {
        &self.config.optimization
    }

    // ==========================================
    // 绩效分析
    // ==========================================

    /// 分析车场所有启用线路（按线路存储顺序返回）
    #[instrument(skip(self), fields(depot_id = %depot_id))]
    pub async fn analyze_route_performance(
        &self,
        depot_id: &str,
        range: DateRange,
    ) -> Result<Vec<RouteAnalysis>, OptimizerError> {
        let routes = self.repo.list_active_routes(depot_id).await?;
        self.analyze_routes(&routes, range).await
    }

    async fn analyze_routes(
        &self,
        routes: &[Route],
        range: DateRange,
    ) -> Result<Vec<RouteAnalysis>, OptimizerError> {
        let mut analyses = Vec::with_capacity(routes.len());
        for route in routes {
            let trips = self
                .repo
                .list_trips(&route.route_id, range, &TripStatus::HISTORY)
                .await?;
            analyses.push(analyze_trips(route, &trips, self.rules())?);
        }
        Ok(analyses)
    }

    // ==========================================
    // 分配优化
    // ==========================================

    /// 优化车场的车辆-线路分配并写回
    ///
    /// # 错误
    /// - 读取失败 / 评分越界: 整个车场优化失败
    ///
    /// 写回阶段的单线路失败记录在 `failed_routes` 中，不作为错误返回
    #[instrument(skip(self), fields(depot_id = %depot_id))]
    pub async fn optimize_route_assignments(
        &self,
        depot_id: &str,
        range: DateRange,
    ) -> Result<OptimizationOutcome, OptimizerError> {
        let routes = self.repo.list_active_routes(depot_id).await?;
        let analyses = self.analyze_routes(&routes, range).await?;
        let buses = self.repo.list_active_buses(depot_id).await?;

        let analysis_map: HashMap<String, RouteAnalysis> = analyses
            .into_iter()
            .map(|a| (a.route_id.clone(), a))
            .collect();
        let assignments = calculate_assignments(&buses, &routes, &analysis_map, self.rules())?;

        let outcome = apply_assignments(self.repo.as_ref(), depot_id, assignments, Utc::now()).await;

        info!(
            depot_id = %depot_id,
            optimized_routes = outcome.optimized_routes,
            total_optimizations = outcome.total_optimizations,
            failed_routes = outcome.failed_routes.len(),
            "线路优化完成"
        );
        Ok(outcome)
    }

    // ==========================================
    // 优化报告
    // ==========================================

    /// 生成车场线路优化报告（只读）
    #[instrument(skip(self), fields(depot_id = %depot_id))]
    pub async fn optimization_report(
        &self,
        depot_id: &str,
        range: DateRange,
    ) -> Result<RouteOptimizationReport, OptimizerError> {
        let analyses = self.analyze_route_performance(depot_id, range).await?;
        Ok(build_optimization_report(depot_id, analyses))
    }
}

fn by_efficiency_desc(a: &RouteAnalysis, b: &RouteAnalysis) -> Ordering {
    b.efficiency
        .value()
        .partial_cmp(&a.efficiency.value())
        .unwrap_or(Ordering::Equal)
}

fn mean(items: &[RouteAnalysis], f: impl Fn(&RouteAnalysis) -> f64) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    items.iter().map(f).sum::<f64>() / items.len() as f64
}

/// 汇总线路分析（空车场的平均值为 0）
pub(super) fn build_optimization_report(
    depot_id: &str,
    mut analyses: Vec<RouteAnalysis>,
) -> RouteOptimizationReport {
    let total = analyses.len();
    let active = analyses.iter().filter(|a| a.total_trips > 0).count();
    let summary = RouteOptimizationSummary {
        total_routes: total,
        active_routes: active,
        inactive_routes: total - active,
        average_efficiency: mean(&analyses, |a| a.efficiency.value()),
        average_demand: mean(&analyses, |a| a.demand.value()),
    };

    analyses.sort_by(by_efficiency_desc);

    let top_performers = analyses
        .iter()
        .filter(|a| a.efficiency.value() > REPORT_TOP_EFFICIENCY)
        .take(REPORT_RANKING_SIZE)
        .cloned()
        .collect();
    let under_performers = analyses
        .iter()
        .rev()
        .filter(|a| a.efficiency.value() < REPORT_UNDER_EFFICIENCY)
        .take(REPORT_RANKING_SIZE)
        .cloned()
        .collect();

    RouteOptimizationReport {
        depot_id: depot_id.to_string(),
        summary,
        routes: analyses,
        top_performers,
        under_performers,
    }
}
