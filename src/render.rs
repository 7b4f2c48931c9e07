// ==========================================
// 车队排班系统 - 文本渲染
// ==========================================
// 职责: 将报告渲染为终端文本（标签走 i18n）
// 红线: 只读报告对象，不参与任何业务计算
// ==========================================

use crate::domain::analysis::{RouteAnalysis, RouteOptimizationReport};
use crate::domain::report::Report;
use crate::engine::readiness::ReadinessReport;
use crate::i18n::t;
use std::fmt;

const RULE: &str = "==================================================";

/// 渲染排班报告
pub fn render_report(report: &Report) -> String {
    ReportText(report).to_string()
}

/// 渲染就绪检查失败
pub fn render_readiness(report: &ReadinessReport) -> String {
    ReadinessText(report).to_string()
}

/// 渲染车场线路优化报告
pub fn render_optimization_report(report: &RouteOptimizationReport) -> String {
    OptimizationText(report).to_string()
}

// ==========================================
// 排班报告
// ==========================================
struct ReportText<'a>(&'a Report);

impl fmt::Display for ReportText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let m = &report.metadata;
        let s = &report.summary;

        writeln!(f, "{}", RULE)?;
        writeln!(f, "{}", t("report.title"))?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "{}: {}", t("report.generated_at"), m.generated_at.to_rfc3339())?;
        writeln!(
            f,
            "{}: {} ~ {}",
            t("report.date_range"),
            m.date_range.start,
            m.date_range.end
        )?;
        writeln!(f, "{}: {}", t("report.duration_days"), m.duration_days)?;

        section_title(f, &t("report.summary"))?;
        writeln!(f, "  {}: {}", t("report.total_buses"), s.total_buses)?;
        writeln!(f, "  {}: {}", t("report.scheduled_buses"), s.scheduled_buses)?;
        writeln!(f, "  {}: {}", t("report.failed_buses"), s.failed_buses)?;
        writeln!(f, "  {}: {}", t("report.total_trips"), s.total_trips)?;
        writeln!(f, "  {}: {:.2}%", t("report.success_rate"), s.success_rate)?;
        writeln!(
            f,
            "  {}: {:.2}",
            t("report.average_trips_per_bus"),
            s.average_trips_per_bus
        )?;

        section_title(f, &t("report.depot_breakdown"))?;
        if report.depot_breakdown.is_empty() {
            none(f)?;
        }
        for d in &report.depot_breakdown {
            write!(
                f,
                "  {:<12} {:<24} {:>4}/{:<4} {:>6} {} {:>7.2}%",
                d.depot_id,
                d.depot_name,
                d.scheduled_buses,
                d.total_buses,
                d.total_trips,
                t("report.trips"),
                d.success_rate
            )?;
            match &d.error {
                Some(e) => writeln!(f, "  {}: {}", t("report.error"), e)?,
                None => writeln!(f)?,
            }
        }

        section_title(f, &t("report.top_performers"))?;
        if report.performance.top_performers.is_empty() {
            none(f)?;
        }
        for (i, p) in report.performance.top_performers.iter().enumerate() {
            writeln!(
                f,
                "  {}. {} ({}) - {} {}",
                i + 1,
                p.depot_name,
                p.depot_id,
                p.trips_scheduled,
                t("report.trips")
            )?;
        }

        section_title(f, &t("report.under_performers"))?;
        if report.performance.under_performers.is_empty() {
            none(f)?;
        }
        for p in &report.performance.under_performers {
            writeln!(
                f,
                "  - {} ({}) - {} {} [{}]",
                p.depot_name,
                p.depot_id,
                p.trips_scheduled,
                t("report.trips"),
                p.issues
            )?;
        }

        section_title(f, &t("report.recommendations"))?;
        if report.recommendations.is_empty() {
            none(f)?;
        }
        for r in &report.recommendations {
            writeln!(f, "  [{}] {}", r.kind, r.message)?;
        }
        Ok(())
    }
}

// ==========================================
// 就绪检查
// ==========================================
struct ReadinessText<'a>(&'a ReadinessReport);

impl fmt::Display for ReadinessText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "{}", t("readiness.not_ready"))?;
        for issue in &report.issues {
            writeln!(f, "  - {}", issue)?;
        }
        if !report.warnings.is_empty() {
            writeln!(f, "{}:", t("readiness.warnings"))?;
            for w in &report.warnings {
                writeln!(f, "  - {}", w)?;
            }
        }
        Ok(())
    }
}

// ==========================================
// 线路优化报告
// ==========================================
struct OptimizationText<'a>(&'a RouteOptimizationReport);

impl fmt::Display for OptimizationText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let s = &report.summary;

        writeln!(f, "{}", RULE)?;
        writeln!(f, "{} - {}", t("analysis.title"), report.depot_id)?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "  {}: {}", t("analysis.total_routes"), s.total_routes)?;
        writeln!(f, "  {}: {}", t("analysis.active_routes"), s.active_routes)?;
        writeln!(f, "  {}: {}", t("analysis.inactive_routes"), s.inactive_routes)?;
        writeln!(
            f,
            "  {}: {:.3}",
            t("analysis.average_efficiency"),
            s.average_efficiency
        )?;
        writeln!(f, "  {}: {:.3}", t("analysis.average_demand"), s.average_demand)?;

        route_section(f, &t("analysis.routes"), &report.routes)?;
        route_section(f, &t("report.top_performers"), &report.top_performers)?;
        route_section(f, &t("report.under_performers"), &report.under_performers)
    }
}

fn section_title(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "\n[{}]", title)
}

fn none(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "  {}", t("report.none"))
}

fn route_section(f: &mut fmt::Formatter<'_>, title: &str, routes: &[RouteAnalysis]) -> fmt::Result {
    section_title(f, title)?;
    if routes.is_empty() {
        return none(f);
    }
    for r in routes {
        writeln!(
            f,
            "  {:<10} {:<24} {:>5} {} occ={} eff={} dem={} {}",
            r.route_id,
            r.route_name,
            r.total_trips,
            t("report.trips"),
            r.average_occupancy,
            r.efficiency,
            r.demand,
            r.recommendation
        )?;
    }
    Ok(())
}
