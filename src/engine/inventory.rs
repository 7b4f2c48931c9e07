// ==========================================
// 车队排班系统 - 车场库存收集
// ==========================================
// 职责: 加载车场及其在役车辆
// 红线: 无在役车辆的车场直接剔除，下游（分批/报告）永远看不到
// ==========================================

use crate::domain::fleet::{Bus, Depot};
use crate::repository::{FleetRepository, RepositoryResult};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// 单个车场的工作集
#[derive(Debug, Clone, PartialEq)]
pub struct DepotInventory {
    pub depot: Depot,
    pub buses: Vec<Bus>,
}

impl DepotInventory {
    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }
}

pub struct DepotInventoryCollector<R: FleetRepository + ?Sized> {
    repo: Arc<R>,
}

impl<R: FleetRepository + ?Sized> DepotInventoryCollector<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// 收集车场库存（保持存储顺序）
    #[instrument(skip(self))]
    pub async fn collect(&self) -> RepositoryResult<Vec<DepotInventory>> {
        let depots = self.repo.list_depots().await?;
        let depot_count = depots.len();
        let mut inventory = Vec::with_capacity(depot_count);

        for depot in depots {
            let buses = self.repo.list_active_buses(&depot.depot_id).await?;
            if buses.is_empty() {
                debug!(depot_id = %depot.depot_id, "车场无在役车辆，跳过");
                continue;
            }
            inventory.push(DepotInventory { depot, buses });
        }

        info!(
            depots_total = depot_count,
            depots_with_buses = inventory.len(),
            buses_total = inventory.iter().map(DepotInventory::bus_count).sum::<usize>(),
            "车场库存收集完成"
        );
        Ok(inventory)
    }
}
