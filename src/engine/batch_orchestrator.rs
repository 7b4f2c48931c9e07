// ==========================================
// 车队排班系统 - 批量排班编排器
// ==========================================
// 阶段1: 各车场线路优化，完全并行（每车场一个任务）
// 阶段2: 车场按批次生成车次，批内并行、批间串行
// 红线: fan-out + join-all，任一任务失败不取消兄弟任务
// 红线: 车次生成失败的车场，全部车辆计为失败（不给部分成绩）
// ==========================================

use crate::config::SchedulerConfig;
use crate::domain::analysis::OptimizationOutcome;
use crate::domain::fleet::DateRange;
use crate::domain::report::DepotSchedulingResult;
use crate::domain::types::DepotPhase;
use crate::engine::cancellation::CancellationSignal;
use crate::engine::error::SchedulingError;
use crate::engine::inventory::DepotInventory;
use crate::engine::route_optimizer::RouteOptimizer;
use crate::engine::trip_generator::{GenerationOptions, GenerationSummary, TripGenerator};
use crate::perf::PerfGuard;
use crate::repository::FleetRepository;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{debug, error, info, instrument, warn};

// ==========================================
// 分批计算
// ==========================================

/// 批大小 = ceil(车场数 / 最大并发)；无车场时为 0
pub fn batch_size(depot_count: usize, max_concurrent: usize) -> usize {
    if depot_count == 0 {
        return 0;
    }
    depot_count.div_ceil(max_concurrent.max(1))
}

/// 按批大小切分（保持原有顺序）
pub fn partition<T>(items: &[T], max_concurrent: usize) -> Vec<&[T]> {
    match batch_size(items.len(), max_concurrent) {
        0 => Vec::new(),
        size => items.chunks(size).collect(),
    }
}

// ==========================================
// BatchOutcome - 编排结果
// ==========================================
#[derive(Debug)]
pub struct BatchOutcome {
    /// 每个车场的优化结果（车场顺序与输入一致）
    pub optimizations: Vec<(String, Result<OptimizationOutcome, SchedulingError>)>,
    /// 每个车场的排班结果（车场顺序与输入一致）
    pub results: Vec<DepotSchedulingResult>,
    pub batch_size: usize,
    pub batch_count: usize,
    /// 各车场最终阶段（车场顺序与输入一致）
    pub phases: Vec<(String, DepotPhase)>,
}

impl BatchOutcome {
    pub fn failed_optimizations(&self) -> usize {
        self.optimizations.iter().filter(|(_, r)| r.is_err()).count()
    }

    pub fn phase_of(&self, depot_id: &str) -> Option<DepotPhase> {
        self.phases
            .iter()
            .find(|(id, _)| id == depot_id)
            .map(|(_, phase)| *phase)
    }
}

// ==========================================
// PhaseTracker - 车场阶段跟踪
// ==========================================
struct PhaseTracker {
    phases: Vec<(String, DepotPhase)>,
}

impl PhaseTracker {
    fn new(depots: &[DepotInventory]) -> Self {
        Self {
            phases: depots
                .iter()
                .map(|d| (d.depot.depot_id.clone(), DepotPhase::Pending))
                .collect(),
        }
    }

    fn advance(&mut self, depot_id: &str, next: DepotPhase) {
        let Some((_, current)) = self.phases.iter_mut().find(|(id, _)| id == depot_id) else {
            return;
        };
        match current.transition_to(next) {
            Some(phase) => {
                debug!(depot_id = %depot_id, from = %current, to = %phase, "车场阶段迁移");
                *current = phase;
            }
            None => warn!(depot_id = %depot_id, from = %current, to = %next, "非法阶段迁移，已忽略"),
        }
    }

    fn advance_all(&mut self, depots: &[DepotInventory], next: DepotPhase) {
        for d in depots {
            self.advance(&d.depot.depot_id, next);
        }
    }

    fn into_phases(self) -> Vec<(String, DepotPhase)> {
        self.phases
    }
}

// ==========================================
// BatchOrchestrator
// ==========================================
pub struct BatchOrchestrator<R, G>
where
    R: FleetRepository + ?Sized + 'static,
    G: TripGenerator + ?Sized + 'static,
{
    optimizer: RouteOptimizer<R>,
    generator: Arc<G>,
    config: Arc<SchedulerConfig>,
    cancel: CancellationSignal,
}

impl<R, G> BatchOrchestrator<R, G>
where
    R: FleetRepository + ?Sized + 'static,
    G: TripGenerator + ?Sized + 'static,
{
    pub fn new(
        repo: Arc<R>,
        generator: Arc<G>,
        config: Arc<SchedulerConfig>,
        cancel: CancellationSignal,
    ) -> Self {
        Self {
            optimizer: RouteOptimizer::new(repo, Arc::clone(&config)),
            generator,
            config,
            cancel,
        }
    }

    /// 执行两阶段编排
    ///
    /// # 参数
    /// - depots: 已过滤的车场库存（不含零车辆车场）
    /// - schedule_range: 车次生成区间
    /// - analysis_range: 线路绩效分析区间
    /// - options: 调用方生成选项，逐车场替换 depot_id 后传给生成器
    #[instrument(skip_all, fields(depots = depots.len()))]
    pub async fn run(
        &self,
        depots: &[DepotInventory],
        schedule_range: DateRange,
        analysis_range: DateRange,
        options: &GenerationOptions,
    ) -> BatchOutcome {
        let mut tracker = PhaseTracker::new(depots);

        tracker.advance_all(depots, DepotPhase::Optimizing);
        let optimizations = self.optimize_all(depots, analysis_range).await;

        tracker.advance_all(depots, DepotPhase::Scheduling);
        let size = batch_size(depots.len(), self.config.scheduling.max_concurrent_scheduling);
        let results = self.schedule_batches(depots, schedule_range, options).await;
        for r in &results {
            tracker.advance(&r.depot_id, r.phase);
        }

        BatchOutcome {
            optimizations,
            batch_count: if size == 0 { 0 } else { depots.len().div_ceil(size) },
            batch_size: size,
            results,
            phases: tracker.into_phases(),
        }
    }

    // ==========================================
    // 阶段1: 线路优化（完全并行）
    // ==========================================
    async fn optimize_all(
        &self,
        depots: &[DepotInventory],
        range: DateRange,
    ) -> Vec<(String, Result<OptimizationOutcome, SchedulingError>)> {
        let _perf = PerfGuard::new("batch.optimize_all");
        let deadline = self.config.scheduling.optimization_task_timeout();

        let handles = depots.iter().map(|inv| {
            let optimizer = self.optimizer.clone();
            let cancel = self.cancel.clone();
            let depot_id = inv.depot.depot_id.clone();
            tokio::spawn(async move {
                guarded(deadline, &cancel, async {
                    optimizer
                        .optimize_route_assignments(&depot_id, range)
                        .await
                        .map_err(|e| SchedulingError::DepotOptimization {
                            depot_id: depot_id.clone(),
                            reason: e.to_string(),
                        })
                })
                .await
            })
        });
        let joined = join_all(handles).await;

        let mut failed = 0usize;
        let results: Vec<_> = depots
            .iter()
            .zip(joined)
            .map(|(inv, joined)| {
                let depot_id = inv.depot.depot_id.clone();
                let result = flatten_join(joined);
                if let Err(e) = &result {
                    failed += 1;
                    error!(depot_id = %depot_id, error = %e, "车场线路优化失败，沿用既有分配");
                }
                (depot_id, result)
            })
            .collect();

        info!(
            depots = depots.len(),
            succeeded = depots.len() - failed,
            failed = failed,
            "线路优化阶段完成"
        );
        results
    }

    // ==========================================
    // 阶段2: 车次生成（分批）
    // ==========================================
    async fn schedule_batches(
        &self,
        depots: &[DepotInventory],
        range: DateRange,
        options: &GenerationOptions,
    ) -> Vec<DepotSchedulingResult> {
        let _perf = PerfGuard::new("batch.schedule_batches");
        let deadline = self.config.scheduling.depot_task_timeout();
        let batches = partition(depots, self.config.scheduling.max_concurrent_scheduling);
        let batch_count = batches.len();
        let mut results = Vec::with_capacity(depots.len());

        for (index, batch) in batches.into_iter().enumerate() {
            info!(batch = index + 1, batch_count = batch_count, depots = batch.len(), "开始处理批次");

            let handles = batch.iter().map(|inv| {
                let generator = Arc::clone(&self.generator);
                let cancel = self.cancel.clone();
                let depot_id = inv.depot.depot_id.clone();
                let depot_options = options.scoped_to(&depot_id);
                tokio::spawn(async move {
                    guarded(deadline, &cancel, async {
                        generator
                            .generate(range.start, range.end, &depot_options)
                            .await
                            .map_err(|e| SchedulingError::DepotScheduling {
                                depot_id: depot_id.clone(),
                                reason: format!("{:#}", e),
                            })
                    })
                    .await
                })
            });
            let joined = join_all(handles).await;

            for (inv, joined) in batch.iter().zip(joined) {
                results.push(depot_result(inv, flatten_join(joined)));
            }
        }
        results
    }
}

/// 任务包装: 截止时间 + 取消信号
async fn guarded<T, F>(
    deadline: Duration,
    cancel: &CancellationSignal,
    fut: F,
) -> Result<T, SchedulingError>
where
    F: Future<Output = Result<T, SchedulingError>>,
{
    if cancel.is_cancelled() {
        return Err(SchedulingError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SchedulingError::Cancelled),
        outcome = tokio::time::timeout(deadline, fut) => match outcome {
            Ok(result) => result,
            Err(_) => Err(SchedulingError::Timeout { secs: deadline.as_secs() }),
        },
    }
}

fn flatten_join<T>(
    joined: Result<Result<T, SchedulingError>, JoinError>,
) -> Result<T, SchedulingError> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(SchedulingError::TaskAborted(e.to_string())),
    }
}

fn depot_result(
    inv: &DepotInventory,
    outcome: Result<GenerationSummary, SchedulingError>,
) -> DepotSchedulingResult {
    let depot = &inv.depot;
    match outcome {
        Ok(summary) => {
            info!(
                depot_id = %depot.depot_id,
                scheduled_buses = summary.scheduled_buses,
                failed_buses = summary.failed_buses,
                total_trips = summary.total_trips,
                "车场排班成功"
            );
            DepotSchedulingResult::succeeded(
                &depot.depot_id,
                &depot.depot_name,
                inv.bus_count(),
                summary.scheduled_buses,
                summary.failed_buses,
                summary.total_trips,
            )
        }
        Err(e) => {
            error!(depot_id = %depot.depot_id, error = %e, "车场排班失败");
            DepotSchedulingResult::failed(
                &depot.depot_id,
                &depot.depot_name,
                inv.bus_count(),
                e.to_string(),
            )
        }
    }
}
