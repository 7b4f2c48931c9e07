// ==========================================
// 车队排班系统 - 报告构建
// ==========================================
// 职责: 车场排班结果 → 汇总 / 车场明细 / 排名 / 运营建议
// 红线: totalBuses=0 时成功率为 0（不得除零、不得出现 NaN）
// 红线: 运营建议可叠加，不互斥
// ==========================================

use crate::config::ReportThresholds;
use crate::domain::fleet::DateRange;
use crate::domain::report::{
    DepotBreakdown, DepotSchedulingResult, PerformanceRanking, Recommendation, Report,
    ReportDateRange, ReportMetadata, ReportSummary, TopPerformer, UnderPerformer,
};
use crate::domain::types::RecommendationType;
use crate::i18n::{t, t_with_args};
use chrono::{DateTime, Utc};

/// 保留两位小数
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// 百分比 (分母为 0 时为 0)
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64
}

pub struct ReportBuilder {
    thresholds: ReportThresholds,
}

impl ReportBuilder {
    pub fn new(thresholds: ReportThresholds) -> Self {
        Self { thresholds }
    }

    /// 构建报告
    pub fn build(
        &self,
        range: DateRange,
        results: &[DepotSchedulingResult],
        generated_at: DateTime<Utc>,
    ) -> Report {
        let summary = Self::summarize(results);

        Report {
            metadata: ReportMetadata {
                generated_at,
                date_range: ReportDateRange {
                    start: range.start,
                    end: range.end,
                },
                duration_days: range.span_days(),
            },
            depot_breakdown: results.iter().map(Self::breakdown).collect(),
            performance: self.rank(results),
            recommendations: self.recommend(results, &summary),
            summary: ReportSummary {
                success_rate: round2(summary.success_rate),
                average_trips_per_bus: round2(summary.average_trips_per_bus),
                ..summary
            },
        }
    }

    /// 汇总（未取整）
    fn summarize(results: &[DepotSchedulingResult]) -> ReportSummary {
        let total_buses: usize = results.iter().map(|r| r.total_buses).sum();
        let scheduled_buses: usize = results.iter().map(|r| r.scheduled_buses).sum();
        let failed_buses: usize = results.iter().map(|r| r.failed_buses).sum();
        let total_trips: usize = results.iter().map(|r| r.total_trips).sum();

        ReportSummary {
            total_buses,
            scheduled_buses,
            failed_buses,
            total_trips,
            success_rate: percentage(scheduled_buses, total_buses),
            average_trips_per_bus: ratio(total_trips, scheduled_buses),
        }
    }

    fn breakdown(r: &DepotSchedulingResult) -> DepotBreakdown {
        DepotBreakdown {
            depot_id: r.depot_id.clone(),
            depot_name: r.depot_name.clone(),
            total_buses: r.total_buses,
            scheduled_buses: r.scheduled_buses,
            failed_buses: r.failed_buses,
            total_trips: r.total_trips,
            success_rate: round2(percentage(r.scheduled_buses, r.total_buses)),
            error: r.error.clone(),
        }
    }

    // ==========================================
    // 排名
    // ==========================================
    fn rank(&self, results: &[DepotSchedulingResult]) -> PerformanceRanking {
        let mut successful: Vec<&DepotSchedulingResult> =
            results.iter().filter(|r| r.success).collect();

        successful.sort_by(|a, b| b.total_trips.cmp(&a.total_trips));
        let top_performers = successful
            .iter()
            .take(self.thresholds.ranking_size)
            .map(|r| TopPerformer {
                depot_id: r.depot_id.clone(),
                depot_name: r.depot_name.clone(),
                trips_scheduled: r.total_trips,
            })
            .collect();

        let mut low: Vec<&DepotSchedulingResult> = successful
            .into_iter()
            .filter(|r| r.total_trips < self.thresholds.under_performer_trips)
            .collect();
        low.sort_by(|a, b| a.total_trips.cmp(&b.total_trips));
        let under_performers = low
            .into_iter()
            .take(self.thresholds.ranking_size)
            .map(|r| UnderPerformer {
                depot_id: r.depot_id.clone(),
                depot_name: r.depot_name.clone(),
                trips_scheduled: r.total_trips,
                issues: r
                    .error
                    .clone()
                    .unwrap_or_else(|| t("report.issue.low_trip_count")),
            })
            .collect();

        PerformanceRanking {
            top_performers,
            under_performers,
        }
    }

    // ==========================================
    // 运营建议
    // ==========================================
    fn recommend(
        &self,
        results: &[DepotSchedulingResult],
        summary: &ReportSummary,
    ) -> Vec<Recommendation> {
        let th = &self.thresholds;
        let mut recs = Vec::new();
        let mut push = |kind: RecommendationType, message: String| {
            recs.push(Recommendation { kind, message })
        };

        if summary.total_buses > 0 {
            if summary.success_rate < th.warning_success_rate {
                let rate = format!("{:.1}", summary.success_rate);
                push(
                    RecommendationType::Warning,
                    t_with_args("report.recommendation.low_success_rate", &[("rate", rate.as_str())]),
                );
            }
            if summary.success_rate < th.critical_success_rate {
                push(
                    RecommendationType::Critical,
                    t("report.recommendation.critical_success_rate"),
                );
            }
        }

        let failed = results.iter().filter(|r| !r.success).count();
        if failed > 0 {
            push(
                RecommendationType::Error,
                t_with_args(
                    "report.recommendation.failed_depots",
                    &[("count", failed.to_string().as_str())],
                ),
            );
        }

        let low_trip = results
            .iter()
            .filter(|r| r.success && r.total_trips < th.low_trip_depot_trips)
            .count();
        if low_trip > 0 {
            push(
                RecommendationType::Info,
                t_with_args(
                    "report.recommendation.low_trip_depots",
                    &[("count", low_trip.to_string().as_str())],
                ),
            );
        }

        if summary.total_trips > 0 && summary.average_trips_per_bus < th.min_average_trips_per_bus {
            push(
                RecommendationType::Optimization,
                t("report.recommendation.low_trips_per_bus"),
            );
        }

        recs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::date;

    fn ok(id: &str, buses: usize, scheduled: usize, trips: usize) -> DepotSchedulingResult {
        DepotSchedulingResult::succeeded(id, id, buses, scheduled, buses - scheduled, trips)
    }

    fn build(results: &[DepotSchedulingResult]) -> Report {
        let range = DateRange::new(date(2025, 3, 1), date(2025, 3, 7)).unwrap();
        ReportBuilder::new(ReportThresholds::default()).build(range, results, Utc::now())
    }

    fn kinds(report: &Report) -> Vec<RecommendationType> {
        report.recommendations.iter().map(|r| r.kind).collect()
    }

    #[test]
    fn test_empty_run_has_zero_rates() {
        let report = build(&[]);
        assert_eq!(report.summary.total_buses, 0);
        assert_eq!(report.summary.success_rate, 0.0);
        assert_eq!(report.summary.average_trips_per_bus, 0.0);
        assert!(report.recommendations.is_empty());
        assert_eq!(report.metadata.duration_days, 7);
    }

    #[test]
    fn test_summary_matches_breakdown() {
        let results = vec![
            ok("A", 10, 10, 40),
            DepotSchedulingResult::failed("B", "B", 5, "boom".to_string()),
            ok("C", 3, 2, 6),
        ];
        let report = build(&results);

        let sum: usize = report.depot_breakdown.iter().map(|d| d.total_buses).sum();
        assert_eq!(report.summary.total_buses, sum);
        assert_eq!(report.summary.scheduled_buses, 12);
        assert_eq!(report.summary.failed_buses, 6);
        // 12 / 18 = 66.666…%
        assert_eq!(report.summary.success_rate, 66.67);
        assert_eq!(report.summary.average_trips_per_bus, 3.83);
        assert_eq!(report.depot_breakdown[1].error.as_deref(), Some("boom"));
        assert_eq!(report.depot_breakdown[2].success_rate, 66.67);
    }

    #[test]
    fn test_rankings() {
        let results = vec![
            ok("A", 4, 4, 30),
            ok("B", 4, 4, 3),
            DepotSchedulingResult::failed("X", "X", 4, "boom".to_string()),
            ok("C", 4, 4, 8),
            ok("D", 4, 4, 50),
        ];
        let report = build(&results);

        let top: Vec<&str> = report
            .performance
            .top_performers
            .iter()
            .map(|p| p.depot_id.as_str())
            .collect();
        assert_eq!(top, vec!["D", "A", "C", "B"]);

        let under: Vec<&str> = report
            .performance
            .under_performers
            .iter()
            .map(|p| p.depot_id.as_str())
            .collect();
        assert_eq!(under, vec!["B", "C"]);
    }

    #[test]
    fn test_recommendations_are_additive() {
        let results = vec![
            ok("A", 10, 5, 4),
            DepotSchedulingResult::failed("B", "B", 10, "boom".to_string()),
        ];
        let report = build(&results);
        // 成功率 25%: warning + critical；失败车场: error；A 车次 < 5: info；4/5 < 2: optimization
        assert_eq!(
            kinds(&report),
            vec![
                RecommendationType::Warning,
                RecommendationType::Critical,
                RecommendationType::Error,
                RecommendationType::Info,
                RecommendationType::Optimization,
            ]
        );
    }

    #[test]
    fn test_warning_without_critical() {
        let report = build(&[ok("A", 10, 7, 70)]);
        assert_eq!(kinds(&report), vec![RecommendationType::Warning]);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round2(66.6666), 66.67);
        assert_eq!(percentage(1, 0), 0.0);
    }
}
