// ==========================================
// 车队排班系统 - 就绪检查
// ==========================================
// 职责: 排班前置条件校验（车辆/线路/车场/司机/售票员）
// 红线: 不返回 Err，所有问题一次性收集，便于完整诊断
// 红线: ready=false 时编排器必须在读取库存之前中止
// ==========================================

use crate::domain::types::StaffRole;
use crate::repository::{FleetRepository, RepositoryResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ==========================================
// ReadinessStats - 统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessStats {
    pub active_buses: usize,
    pub active_routes: usize,
    pub depots: usize,
    pub active_drivers: usize,
    pub active_conductors: usize,
    pub buses_without_depot: usize,
}

// ==========================================
// ReadinessReport - 检查结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub ready: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>, // 非致命
    pub stats: ReadinessStats,
}

// ==========================================
// ReadinessValidator
// ==========================================
pub struct ReadinessValidator<R: FleetRepository + ?Sized> {
    repo: Arc<R>,
}

impl<R: FleetRepository + ?Sized> ReadinessValidator<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// 执行就绪检查
    ///
    /// 存储失败不会向上抛出，而是记为一条 issue
    #[instrument(skip(self))]
    pub async fn validate(&self) -> ReadinessReport {
        match self.collect_stats().await {
            Ok(stats) => {
                let report = Self::evaluate(stats);
                if report.ready {
                    info!(stats = ?report.stats, "就绪检查通过");
                } else {
                    warn!(issues = ?report.issues, "就绪检查未通过");
                }
                report
            }
            Err(e) => {
                warn!(error = %e, "就绪检查读取失败");
                ReadinessReport {
                    ready: false,
                    issues: vec![format!("System validation error: {}", e)],
                    warnings: Vec::new(),
                    stats: ReadinessStats::default(),
                }
            }
        }
    }

    async fn collect_stats(&self) -> RepositoryResult<ReadinessStats> {
        Ok(ReadinessStats {
            active_buses: self.repo.count_active_buses().await?,
            active_routes: self.repo.count_active_routes().await?,
            depots: self.repo.count_depots().await?,
            active_drivers: self.repo.count_active_staff(StaffRole::Driver).await?,
            active_conductors: self.repo.count_active_staff(StaffRole::Conductor).await?,
            buses_without_depot: self.repo.count_buses_without_depot().await?,
        })
    }

    /// 根据统计判定（纯函数）
    fn evaluate(stats: ReadinessStats) -> ReadinessReport {
        let mut issues = Vec::new();
        let mut warnings = Vec::new();

        if stats.active_buses == 0 {
            issues.push("No active buses found".to_string());
        }
        if stats.active_routes == 0 {
            issues.push("No active routes found".to_string());
        }
        if stats.depots == 0 {
            issues.push("No depots found".to_string());
        }
        if stats.active_drivers == 0 {
            issues.push("No active drivers found".to_string());
        }
        if stats.active_conductors == 0 {
            issues.push("No active conductors found".to_string());
        }
        if stats.buses_without_depot > 0 {
            warnings.push(format!(
                "{} active buses are not assigned to any depot",
                stats.buses_without_depot
            ));
        }

        ReadinessReport {
            ready: issues.is_empty(),
            issues,
            warnings,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::*;

    fn healthy() -> ReadinessStats {
        ReadinessStats {
            active_buses: 10,
            active_routes: 4,
            depots: 2,
            active_drivers: 8,
            active_conductors: 8,
            buses_without_depot: 0,
        }
    }

    #[test]
    fn test_healthy_fleet_is_ready() {
        let report = ReadinessValidator::<dyn FleetRepository>::evaluate(healthy());
        assert!(report.ready);
        assert!(report.issues.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_all_issues_are_collected() {
        let report = ReadinessValidator::<dyn FleetRepository>::evaluate(ReadinessStats::default());
        assert!(!report.ready);
        assert_eq!(report.issues.len(), 5);
    }

    #[test]
    fn test_unassigned_buses_only_warn() {
        let mut stats = healthy();
        stats.buses_without_depot = 3;
        let report = ReadinessValidator::<dyn FleetRepository>::evaluate(stats);
        assert!(report.ready);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("3 "));
    }

    #[tokio::test]
    async fn test_store_failure_becomes_issue() {
        let repo = Arc::new(MockFleetRepository {
            depots: vec![depot("D1")],
            buses: vec![bus("B1", "D1", 50, false)].into(),
            drivers: 1,
            conductors: 1,
            failing_counts: true,
            ..Default::default()
        });

        let report = ReadinessValidator::new(repo).validate().await;

        assert!(!report.ready);
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].starts_with("System validation error: "));
        assert!(report.issues[0].contains("database is locked"));
        assert_eq!(report.stats, ReadinessStats::default());
    }
}
