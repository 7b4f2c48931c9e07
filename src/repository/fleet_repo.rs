// ==========================================
// 车队排班系统 - 车队数据仓储 Trait
// ==========================================
// 职责: 定义排班引擎所需的窄数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做读取与显式写回
// 约束: 两个写接口之间不保证事务性
// ==========================================

use crate::domain::fleet::{AssignedBus, Bus, CurrentRoute, DateRange, Depot, Route, Trip};
use crate::domain::types::{StaffRole, TripStatus};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// FleetRepository Trait
// ==========================================
// 实现者: SqliteFleetRepository（使用 rusqlite）
#[async_trait]
pub trait FleetRepository: Send + Sync {
    // ===== 读取 =====

    /// 查询全部车场
    async fn list_depots(&self) -> RepositoryResult<Vec<Depot>>;

    /// 查询车场的在役车辆
    async fn list_active_buses(&self, depot_id: &str) -> RepositoryResult<Vec<Bus>>;

    /// 查询车场的启用线路（status=active 且 is_active，附带启用班次）
    async fn list_active_routes(&self, depot_id: &str) -> RepositoryResult<Vec<Route>>;

    /// 查询线路在日期范围内（含首尾）指定状态的车次
    async fn list_trips(
        &self,
        route_id: &str,
        range: DateRange,
        statuses: &[TripStatus],
    ) -> RepositoryResult<Vec<Trip>>;

    // ===== 统计（就绪检查用）=====

    async fn count_active_buses(&self) -> RepositoryResult<usize>;

    async fn count_active_routes(&self) -> RepositoryResult<usize>;

    async fn count_depots(&self) -> RepositoryResult<usize>;

    async fn count_active_staff(&self, role: StaffRole) -> RepositoryResult<usize>;

    /// 未归属任何车场的在役车辆数
    async fn count_buses_without_depot(&self) -> RepositoryResult<usize>;

    // ===== 写回（乐观锁）=====

    /// 覆盖线路的已分配车辆列表
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: revision 不匹配
    /// - `RepositoryError::NotFound`: 线路不存在
    async fn update_route_assignment(
        &self,
        route_id: &str,
        buses: &[AssignedBus],
        expected_revision: i64,
    ) -> RepositoryResult<()>;

    /// 覆盖车辆的当前线路引用
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: revision 不匹配
    /// - `RepositoryError::NotFound`: 车辆不存在
    async fn update_bus_current_route(
        &self,
        bus_id: &str,
        route: Option<&CurrentRoute>,
        expected_revision: i64,
    ) -> RepositoryResult<()>;

    // ===== 车次生成器专用 =====

    /// 批量写入车次（重复的 线路/车辆/日期/发车时刻 被忽略）
    ///
    /// # 返回
    /// - 实际新增的车次数
    ///
    /// 排班引擎本身从不调用此接口，仅由车次生成器使用。
    async fn insert_trips(&self, trips: &[Trip]) -> RepositoryResult<usize>;
}
