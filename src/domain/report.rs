// ==========================================
// 车队排班系统 - 排班报告模型
// ==========================================
// 职责: 车场排班结果 + 汇总报告（每次调用构建一次，不持久化）
// 对齐: 报告 JSON 使用 camelCase 键
// ==========================================

use crate::domain::types::{DepotPhase, RecommendationType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// DepotSchedulingResult - 单车场排班结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepotSchedulingResult {
    pub depot_id: String,
    pub depot_name: String,
    pub total_buses: usize,
    pub scheduled_buses: usize,
    pub failed_buses: usize,
    pub total_trips: usize,
    pub success: bool,
    pub error: Option<String>,
    pub phase: DepotPhase,
}

impl DepotSchedulingResult {
    /// 成功结果
    pub fn succeeded(
        depot_id: &str,
        depot_name: &str,
        total_buses: usize,
        scheduled_buses: usize,
        failed_buses: usize,
        total_trips: usize,
    ) -> Self {
        Self {
            depot_id: depot_id.to_string(),
            depot_name: depot_name.to_string(),
            total_buses,
            scheduled_buses,
            failed_buses,
            total_trips,
            success: true,
            error: None,
            phase: DepotPhase::Success,
        }
    }

    /// 失败结果：整个车场的车辆计为失败，不给部分成绩
    pub fn failed(depot_id: &str, depot_name: &str, total_buses: usize, reason: String) -> Self {
        Self {
            depot_id: depot_id.to_string(),
            depot_name: depot_name.to_string(),
            total_buses,
            scheduled_buses: 0,
            failed_buses: total_buses,
            total_trips: 0,
            success: false,
            error: Some(reason),
            phase: DepotPhase::Failed,
        }
    }
}

// ==========================================
// Report - 排班报告
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: ReportSummary,
    pub depot_breakdown: Vec<DepotBreakdown>,
    pub performance: PerformanceRanking,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub date_range: ReportDateRange,
    pub duration_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_buses: usize,
    pub scheduled_buses: usize,
    pub failed_buses: usize,
    pub total_trips: usize,
    pub success_rate: f64,          // 百分比，保留两位小数
    pub average_trips_per_bus: f64, // 保留两位小数
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepotBreakdown {
    pub depot_id: String,
    pub depot_name: String,
    pub total_buses: usize,
    pub scheduled_buses: usize,
    pub failed_buses: usize,
    pub total_trips: usize,
    pub success_rate: f64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRanking {
    pub top_performers: Vec<TopPerformer>,
    pub under_performers: Vec<UnderPerformer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPerformer {
    pub depot_id: String,
    pub depot_name: String,
    pub trips_scheduled: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnderPerformer {
    pub depot_id: String,
    pub depot_name: String,
    pub trips_scheduled: usize,
    pub issues: String,
}

/// 运营建议
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    pub message: String,
}
