// ==========================================
// 车队排班系统 - 批量排班 API
// ==========================================
// 职责: 对外暴露 quick / date / range 三种批量排班入口 + 车场线路分析
// 流程: 就绪检查 → 库存收集 → 编排器(优化 + 分批生成) → 报告
// 红线: 就绪检查未通过时在读取库存之前中止，不产生任何写入
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::SchedulerConfig;
use crate::domain::analysis::RouteOptimizationReport;
use crate::domain::fleet::DateRange;
use crate::domain::report::Report;
use crate::engine::batch_orchestrator::BatchOrchestrator;
use crate::engine::cancellation::CancellationSignal;
use crate::engine::error::SchedulingError;
use crate::engine::inventory::DepotInventoryCollector;
use crate::engine::readiness::ReadinessValidator;
use crate::engine::report_builder::ReportBuilder;
use crate::engine::route_optimizer::RouteOptimizer;
use crate::engine::trip_generator::{GenerationOptions, TripGenerator};
use crate::perf::PerfGuard;
use crate::repository::FleetRepository;
use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 区间排班选项
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOptions {
    /// 分析窗口的截止日（缺省为当天）
    pub reference_date: Option<NaiveDate>,
    /// 透传给车次生成器的选项（depot_id 由编排器逐车场替换）
    #[serde(default)]
    pub generation: GenerationOptions,
}

impl ScheduleOptions {
    pub fn as_of(date: NaiveDate) -> Self {
        Self {
            reference_date: Some(date),
            ..Default::default()
        }
    }

    fn reference_date_or_today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Local::now().date_naive())
    }
}

// ==========================================
// SchedulingApi - 批量排班 API
// ==========================================
pub struct SchedulingApi<R, G>
where
    R: FleetRepository + ?Sized + 'static,
    G: TripGenerator + ?Sized + 'static,
{
    repo: Arc<R>,
    generator: Arc<G>,
    config: Arc<SchedulerConfig>,
    cancel: CancellationSignal,
}

impl<R, G> SchedulingApi<R, G>
where
    R: FleetRepository + ?Sized + 'static,
    G: TripGenerator + ?Sized + 'static,
{
    /// 创建新的SchedulingApi实例
    ///
    /// # 参数
    /// - repo: 车队数据仓储
    /// - generator: 车次生成服务
    /// - config: 排班配置（不可变）
    pub fn new(repo: Arc<R>, generator: Arc<G>, config: Arc<SchedulerConfig>) -> Self {
        Self::with_cancellation(repo, generator, config, CancellationSignal::new())
    }

    /// 使用外部取消信号创建（例如 Ctrl-C）
    pub fn with_cancellation(
        repo: Arc<R>,
        generator: Arc<G>,
        config: Arc<SchedulerConfig>,
        cancel: CancellationSignal,
    ) -> Self {
        Self {
            repo,
            generator,
            config,
            cancel,
        }
    }

    // ==========================================
    // 批量排班入口
    // ==========================================

    /// 从参考日（缺省今天）起排 days 天（含参考日）
    ///
    /// # 错误
    /// - days == 0 或结束日超出日历范围: ApiError::InvalidInput
    pub async fn quick_schedule(&self, days: u32, options: ScheduleOptions) -> ApiResult<Report> {
        if days == 0 {
            return Err(ApiError::InvalidInput("排班天数必须大于 0".to_string()));
        }
        let start = options.reference_date_or_today();
        let range = DateRange::starting(start, days).ok_or_else(|| {
            ApiError::InvalidInput(format!("排班天数超出日历范围: {}", days))
        })?;
        info!(days = days, start = %range.start, end = %range.end, "快速排班");
        let options = ScheduleOptions {
            reference_date: Some(start),
            ..options
        };
        self.schedule_date_range(range.start, range.end, options)
            .await
    }

    /// 单日排班
    pub async fn schedule_for_date(
        &self,
        date: NaiveDate,
        options: ScheduleOptions,
    ) -> ApiResult<Report> {
        self.schedule_date_range(date, date, options).await
    }

    /// 区间排班
    ///
    /// # 返回
    /// - Ok(Report): 本次运行的汇总报告（部分车场失败不视为错误）
    /// - Err(ApiError::NotReady): 就绪检查未通过，未做任何写入
    #[instrument(skip(self, options), fields(start = %start, end = %end))]
    pub async fn schedule_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        options: ScheduleOptions,
    ) -> ApiResult<Report> {
        let _perf = PerfGuard::new("api.schedule_date_range");

        let range =
            DateRange::new(start, end).ok_or_else(|| SchedulingError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            })?;
        let as_of = options.reference_date_or_today();
        let analysis_range =
            DateRange::trailing(as_of, self.config.optimization.history_window_days).ok_or_else(
                || SchedulingError::AnalysisWindowOutOfRange {
                    as_of: as_of.to_string(),
                    days: self.config.optimization.history_window_days,
                },
            )?;

        // ===== 1. 就绪检查 =====
        let readiness = ReadinessValidator::new(Arc::clone(&self.repo))
            .validate()
            .await;
        for w in &readiness.warnings {
            warn!(warning = %w, "就绪检查告警");
        }
        if !readiness.ready {
            return Err(ApiError::NotReady { report: readiness });
        }

        // ===== 2. 库存收集 =====
        let inventories = DepotInventoryCollector::new(Arc::clone(&self.repo))
            .collect()
            .await?;
        info!(depots = inventories.len(), "待排班车场");

        // ===== 3. 优化 + 分批生成 =====
        let orchestrator = BatchOrchestrator::new(
            Arc::clone(&self.repo),
            Arc::clone(&self.generator),
            Arc::clone(&self.config),
            self.cancel.clone(),
        );
        let outcome = orchestrator
            .run(&inventories, range, analysis_range, &options.generation)
            .await;
        if outcome.failed_optimizations() > 0 {
            warn!(
                failed = outcome.failed_optimizations(),
                "部分车场线路优化失败，已沿用既有分配"
            );
        }

        // ===== 4. 报告 =====
        let report = ReportBuilder::new(self.config.report.clone()).build(
            range,
            &outcome.results,
            Utc::now(),
        );
        info!(
            total_buses = report.summary.total_buses,
            scheduled_buses = report.summary.scheduled_buses,
            total_trips = report.summary.total_trips,
            success_rate = report.summary.success_rate,
            "批量排班完成"
        );
        Ok(report)
    }

    // ==========================================
    // 车场线路分析（只读）
    // ==========================================

    /// 车场线路优化报告（截止今天的最近 days 天）
    pub async fn analyze_depot(
        &self,
        depot_id: &str,
        days: u32,
    ) -> ApiResult<RouteOptimizationReport> {
        self.analyze_depot_as_of(depot_id, days, Local::now().date_naive())
            .await
    }

    pub async fn analyze_depot_as_of(
        &self,
        depot_id: &str,
        days: u32,
        as_of: NaiveDate,
    ) -> ApiResult<RouteOptimizationReport> {
        if depot_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("车场ID不能为空".to_string()));
        }
        if days == 0 {
            return Err(ApiError::InvalidInput("分析天数必须大于 0".to_string()));
        }

        let known = self
            .repo
            .list_depots()
            .await?
            .iter()
            .any(|d| d.depot_id == depot_id);
        if !known {
            return Err(ApiError::NotFound(format!("车场(id={})不存在", depot_id)));
        }

        let range = DateRange::trailing(as_of, days).ok_or_else(|| {
            ApiError::InvalidInput(format!("分析天数超出日历范围: {}", days))
        })?;
        let optimizer = RouteOptimizer::new(Arc::clone(&self.repo), Arc::clone(&self.config));
        let report = optimizer.optimization_report(depot_id, range).await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::*;
    use crate::engine::trip_generator::AssignedRouteTripGenerator;
    use chrono::Duration;

    type Api = SchedulingApi<MockFleetRepository, AssignedRouteTripGenerator<MockFleetRepository>>;

    fn ready_repo() -> MockFleetRepository {
        let as_of = date(2025, 3, 10);
        MockFleetRepository {
            depots: vec![depot("D1"), depot("D2")],
            buses: vec![bus("B1", "D1", 50, false), bus("B2", "D1", 50, false)].into(),
            routes: vec![route("R1", "D1", 100.0, 2)].into(),
            trips: vec![
                trip("R1", as_of - Duration::days(5), 50, 40, 20.0),
                trip("R1", as_of - Duration::days(3), 50, 45, 20.0),
            ]
            .into(),
            drivers: 3,
            conductors: 3,
            ..Default::default()
        }
    }

    fn api(repo: MockFleetRepository) -> (Arc<MockFleetRepository>, Api) {
        let repo = Arc::new(repo);
        let config = Arc::new(SchedulerConfig::default());
        let generator = Arc::new(AssignedRouteTripGenerator::new(
            Arc::clone(&repo),
            config.trip_generation.clone(),
        ));
        (Arc::clone(&repo), SchedulingApi::new(repo, generator, config))
    }

    #[tokio::test]
    async fn test_range_schedules_only_depots_with_buses() {
        let (repo, api) = api(ready_repo());

        let report = api
            .schedule_date_range(
                date(2025, 3, 11),
                date(2025, 3, 13),
                ScheduleOptions::as_of(date(2025, 3, 10)),
            )
            .await
            .unwrap();

        // D2 没有车辆，不出现在报告中
        assert_eq!(report.depot_breakdown.len(), 1);
        assert_eq!(report.depot_breakdown[0].depot_id, "D1");
        assert_eq!(report.summary.total_buses, 2);
        assert_eq!(report.summary.scheduled_buses, 2);
        // 2 辆车 × 2 个班次 × 3 天
        assert_eq!(report.summary.total_trips, 12);
        assert_eq!(report.summary.success_rate, 100.0);
        assert_eq!(report.metadata.duration_days, 3);

        assert!(repo.bus("B1").unwrap().current_route.is_some());
        assert_eq!(repo.route("R1").unwrap().assigned_buses.len(), 2);
    }

    #[tokio::test]
    async fn test_not_ready_aborts_without_writes() {
        let repo = MockFleetRepository {
            conductors: 0,
            ..ready_repo()
        };
        let (repo, api) = api(repo);

        let err = api
            .schedule_date_range(date(2025, 3, 11), date(2025, 3, 11), ScheduleOptions::default())
            .await
            .unwrap_err();

        match err {
            ApiError::NotReady { report } => {
                assert!(!report.ready);
                assert_eq!(report.issues, vec!["No active conductors found".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(repo.trips.lock().unwrap().len(), 2);
        assert!(repo.bus("B1").unwrap().current_route.is_none());
    }

    #[tokio::test]
    async fn test_store_failure_during_readiness_aborts() {
        let repo = MockFleetRepository {
            failing_counts: true,
            ..ready_repo()
        };
        let (repo, api) = api(repo);

        let err = api
            .schedule_for_date(date(2025, 3, 11), ScheduleOptions::default())
            .await
            .unwrap_err();

        let ApiError::NotReady { report } = err else {
            panic!("expected NotReady");
        };
        assert!(report.issues[0].starts_with("System validation error: "));
        assert!(repo.bus("B1").unwrap().current_route.is_none());
    }

    #[tokio::test]
    async fn test_reversed_range_is_invalid_input() {
        let (_, api) = api(ready_repo());
        let err = api
            .schedule_date_range(date(2025, 3, 12), date(2025, 3, 11), ScheduleOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_quick_schedule_rejects_zero_days() {
        let (_, api) = api(ready_repo());
        assert!(matches!(
            api.quick_schedule(0, ScheduleOptions::default()).await,
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_quick_schedule_spans_from_today() {
        let (_, api) = api(ready_repo());
        let report = api.quick_schedule(2, ScheduleOptions::default()).await.unwrap();
        let today = Local::now().date_naive();
        assert_eq!(report.metadata.date_range.start, today);
        assert_eq!(report.metadata.date_range.end, today + Duration::days(1));
        assert_eq!(report.metadata.duration_days, 2);
    }

    #[tokio::test]
    async fn test_day_counts_past_calendar_are_invalid_input() {
        let (repo, api) = api(ready_repo());

        assert!(matches!(
            api.quick_schedule(u32::MAX, ScheduleOptions::default()).await,
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            api.analyze_depot("D1", u32::MAX).await,
            Err(ApiError::InvalidInput(_))
        ));
        assert!(repo.bus("B1").unwrap().current_route.is_none());
    }

    #[tokio::test]
    async fn test_history_window_past_calendar_is_invalid_input() {
        let repo = Arc::new(ready_repo());
        // 绕过 validate() 直接注入超大窗口
        let mut config = SchedulerConfig::default();
        config.optimization.history_window_days = u32::MAX;
        let config = Arc::new(config);
        let generator = Arc::new(AssignedRouteTripGenerator::new(
            Arc::clone(&repo),
            config.trip_generation.clone(),
        ));
        let api = SchedulingApi::new(Arc::clone(&repo), generator, config);

        let err = api
            .schedule_date_range(
                date(2025, 3, 11),
                date(2025, 3, 11),
                ScheduleOptions::as_of(date(2025, 3, 10)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::InvalidInput(_)));
        assert_eq!(repo.trips.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_generation_options_flow_from_caller() {
        let (_, api) = api(ready_repo());
        let options = ScheduleOptions {
            generation: GenerationOptions {
                max_daily_trips: Some(1),
                ..Default::default()
            },
            ..ScheduleOptions::as_of(date(2025, 3, 10))
        };

        let report = api
            .schedule_for_date(date(2025, 3, 11), options)
            .await
            .unwrap();

        // 2 辆车 × 每日 1 班
        assert_eq!(report.summary.total_trips, 2);
    }

    #[tokio::test]
    async fn test_quick_schedule_starts_at_reference_date() {
        let (_, api) = api(ready_repo());
        let report = api
            .quick_schedule(3, ScheduleOptions::as_of(date(2025, 3, 10)))
            .await
            .unwrap();
        assert_eq!(report.metadata.date_range.start, date(2025, 3, 10));
        assert_eq!(report.metadata.date_range.end, date(2025, 3, 12));
    }

    #[tokio::test]
    async fn test_analyze_depot_is_read_only() {
        let (repo, api) = api(ready_repo());

        let first = api.analyze_depot_as_of("D1", 30, date(2025, 3, 10)).await.unwrap();
        let second = api.analyze_depot_as_of("D1", 30, date(2025, 3, 10)).await.unwrap();

        assert_eq!(first.summary, second.summary);
        assert_eq!(first.summary.total_routes, 1);
        assert_eq!(first.routes[0].total_trips, 2);
        assert!(repo.route("R1").unwrap().assigned_buses.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_unknown_depot() {
        let (_, api) = api(ready_repo());
        assert!(matches!(
            api.analyze_depot("NOPE", 30).await,
            Err(ApiError::NotFound(_))
        ));
    }
}
