// ==========================================
// 车队排班系统 - 领域类型定义
// ==========================================
// 职责: 车次状态、人员角色、线路建议、车场阶段等枚举
// 序列化格式: SCREAMING_SNAKE_CASE / lowercase (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 车次状态 (Trip Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Scheduled, // 已排班
    Running,   // 运行中
    Completed, // 已完成
    Cancelled, // 已取消
}

impl TripStatus {
    /// 参与历史绩效分析的车次状态
    pub const HISTORY: [TripStatus; 2] = [TripStatus::Completed, TripStatus::Running];

    /// 从数据库字符串解析（未知值视为已取消，不参与分析）
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "scheduled" => TripStatus::Scheduled,
            "running" => TripStatus::Running,
            "completed" => TripStatus::Completed,
            _ => TripStatus::Cancelled,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            TripStatus::Scheduled => "scheduled",
            TripStatus::Running => "running",
            TripStatus::Completed => "completed",
            TripStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 人员角色 (Staff Role)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Driver,    // 司机
    Conductor, // 售票员
}

impl StaffRole {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            StaffRole::Driver => "driver",
            StaffRole::Conductor => "conductor",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 线路建议 (Route Recommendation)
// ==========================================
// 规则判定顺序见 route_optimizer::analysis::classify_route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteRecommendation {
    Inactive,          // 停运（无历史或表现极差）
    ReduceFrequency,   // 减少班次
    Maintain,          // 维持现状
    IncreaseFrequency, // 增加班次
    AddBuses,          // 增配车辆
}

impl fmt::Display for RouteRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteRecommendation::Inactive => write!(f, "INACTIVE"),
            RouteRecommendation::ReduceFrequency => write!(f, "REDUCE_FREQUENCY"),
            RouteRecommendation::Maintain => write!(f, "MAINTAIN"),
            RouteRecommendation::IncreaseFrequency => write!(f, "INCREASE_FREQUENCY"),
            RouteRecommendation::AddBuses => write!(f, "ADD_BUSES"),
        }
    }
}

// ==========================================
// 车场处理阶段 (Depot Phase)
// ==========================================
// PENDING → OPTIMIZING → SCHEDULING → {SUCCESS | FAILED}
// 单次调用内没有重试边: FAILED 为终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepotPhase {
    Pending,
    Optimizing,
    Scheduling,
    Success,
    Failed,
}

impl DepotPhase {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, DepotPhase::Success | DepotPhase::Failed)
    }

    /// 状态迁移检查
    ///
    /// # 返回
    /// - Some(next): 迁移合法
    /// - None: 迁移非法（终态不可离开，阶段不可回退）
    ///
    /// 优化失败不会终止车场，车场仍进入 SCHEDULING（沿用历史分配）。
    pub fn transition_to(self, next: DepotPhase) -> Option<DepotPhase> {
        use DepotPhase::*;
        let allowed = match (self, next) {
            (Pending, Optimizing) => true,
            (Pending, Scheduling) => true,
            (Optimizing, Scheduling) => true,
            (Scheduling, Success) | (Scheduling, Failed) => true,
            (Pending, Failed) | (Optimizing, Failed) => true,
            _ => false,
        };
        allowed.then_some(next)
    }
}

impl fmt::Display for DepotPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepotPhase::Pending => write!(f, "PENDING"),
            DepotPhase::Optimizing => write!(f, "OPTIMIZING"),
            DepotPhase::Scheduling => write!(f, "SCHEDULING"),
            DepotPhase::Success => write!(f, "SUCCESS"),
            DepotPhase::Failed => write!(f, "FAILED"),
        }
    }
}

// ==========================================
// 运营建议类型 (Recommendation Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    Warning,
    Critical,
    Error,
    Info,
    Optimization,
}

impl fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationType::Warning => write!(f, "WARNING"),
            RecommendationType::Critical => write!(f, "CRITICAL"),
            RecommendationType::Error => write!(f, "ERROR"),
            RecommendationType::Info => write!(f, "INFO"),
            RecommendationType::Optimization => write!(f, "OPTIMIZATION"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_status_roundtrip_db_str() {
        for status in [
            TripStatus::Scheduled,
            TripStatus::Running,
            TripStatus::Completed,
            TripStatus::Cancelled,
        ] {
            assert_eq!(TripStatus::from_str(status.to_db_str()), status);
        }
        assert_eq!(TripStatus::from_str("unknown"), TripStatus::Cancelled);
    }

    #[test]
    fn test_depot_phase_forward_only() {
        assert_eq!(
            DepotPhase::Pending.transition_to(DepotPhase::Optimizing),
            Some(DepotPhase::Optimizing)
        );
        assert_eq!(
            DepotPhase::Scheduling.transition_to(DepotPhase::Failed),
            Some(DepotPhase::Failed)
        );
        // 终态不可离开（无重试）
        assert_eq!(DepotPhase::Failed.transition_to(DepotPhase::Scheduling), None);
        assert_eq!(DepotPhase::Success.transition_to(DepotPhase::Failed), None);
        // 不可回退
        assert_eq!(DepotPhase::Scheduling.transition_to(DepotPhase::Optimizing), None);
        assert!(DepotPhase::Failed.is_terminal());
    }

    #[test]
    fn test_recommendation_serde_names() {
        let json = serde_json::to_string(&RouteRecommendation::IncreaseFrequency).unwrap();
        assert_eq!(json, "\"INCREASE_FREQUENCY\"");
        let json = serde_json::to_string(&RecommendationType::Optimization).unwrap();
        assert_eq!(json, "\"optimization\"");
    }
}
