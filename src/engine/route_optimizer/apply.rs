// ==========================================
// 车队排班系统 - 分配方案写回
// ==========================================
// 职责: 覆盖线路已分配车辆列表 + 覆盖车辆当前线路
// 红线: 单条线路写回失败只记录，不影响同车场其他线路
// 并发: 乐观锁（revision）保护，过期写入返回 OptimisticLockFailure
// ==========================================

use crate::domain::analysis::{Assignment, OptimizationOutcome, RouteApplyFailure};
use crate::domain::fleet::{AssignedBus, CurrentRoute};
use crate::repository::{FleetRepository, RepositoryResult};
use chrono::{DateTime, Utc};
use tracing::{error, info};

/// 写回全部分配方案（逐条线路隔离失败）
pub(super) async fn apply_assignments<R: FleetRepository + ?Sized>(
    repo: &R,
    depot_id: &str,
    assignments: Vec<Assignment>,
    assigned_at: DateTime<Utc>,
) -> OptimizationOutcome {
    let mut outcome = OptimizationOutcome {
        depot_id: depot_id.to_string(),
        ..Default::default()
    };

    for assignment in &assignments {
        match apply_one(repo, assignment, assigned_at).await {
            Ok(()) => {
                outcome.optimized_routes += 1;
                outcome.total_optimizations += assignment.buses.len();
                info!(
                    depot_id = %depot_id,
                    route_id = %assignment.route_id,
                    buses = assignment.buses.len(),
                    "线路分配已写回"
                );
            }
            Err(e) => {
                error!(
                    depot_id = %depot_id,
                    route_id = %assignment.route_id,
                    error = %e,
                    "线路分配写回失败"
                );
                outcome.failed_routes.push(RouteApplyFailure {
                    route_id: assignment.route_id.clone(),
                    route_name: assignment.route_name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    outcome.assignments = assignments;
    outcome
}

async fn apply_one<R: FleetRepository + ?Sized>(
    repo: &R,
    assignment: &Assignment,
    assigned_at: DateTime<Utc>,
) -> RepositoryResult<()> {
    let assigned: Vec<AssignedBus> = assignment
        .buses
        .iter()
        .map(|b| AssignedBus {
            bus_id: b.bus_id.clone(),
            bus_number: b.bus_number.clone(),
            capacity: b.capacity,
            assigned_at,
        })
        .collect();

    repo.update_route_assignment(&assignment.route_id, &assigned, assignment.route_revision)
        .await?;

    let current = CurrentRoute {
        route_id: assignment.route_id.clone(),
        route_name: assignment.route_name.clone(),
        assigned_at,
    };
    for bus in &assignment.buses {
        repo.update_bus_current_route(&bus.bus_id, Some(&current), bus.expected_revision)
            .await?;
    }
    Ok(())
}
