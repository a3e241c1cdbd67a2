mod stream_report;
mod summary_report;

use crate::stats::Stats;
use crate::summary::Summary;
use crate::trace::Trace;
use lapse_summary_model::{ScenarioReport, TimingStats, TraceRecord};
use std::io::Write;
use std::time::Duration;

pub use stream_report::StreamReportHandler;
pub use summary_report::{write_summary, SummaryFormat, SummaryReportHandler};

/// Destination of a report.
pub type ReportWriter = Box<dyn Write + Send>;

/// A consumer of the trace stream that produces a report.
///
/// Handlers are started before the benchmark runs and must be finalized afterwards, whether or
/// not the run completed, so that buffered traces are drained into the report.
pub trait ReportHandler {
    fn name(&self) -> &str;

    /// Subscribe to the trace stream.
    fn start(&mut self) -> anyhow::Result<()>;

    /// Drain outstanding traces and write the report.
    fn finalize(&mut self) -> anyhow::Result<()>;
}

/// Convert a summary into the serializable per-scenario model, in reporting order.
pub fn scenario_reports(summary: &Summary) -> Vec<ScenarioReport> {
    summary
        .iter()
        .map(|(id, stats)| ScenarioReport {
            id: id.to_string(),
            count: stats.perceived().count(),
            error_rate: stats.perceived().error_rate(),
            perceived: timing_stats(stats.perceived()),
            user: timing_stats(stats.user()),
            system: timing_stats(stats.system()),
        })
        .collect()
}

fn timing_stats(stats: &Stats) -> TimingStats {
    TimingStats {
        min_ns: nanos(stats.min().unwrap_or_default()),
        max_ns: nanos(stats.max().unwrap_or_default()),
        mean_ns: nanos(stats.mean().unwrap_or_default()),
        median_ns: nanos(stats.median().unwrap_or_default()),
        std_dev_ns: nanos(stats.std_dev().unwrap_or_default()),
        p90_ns: nanos(stats.percentile(90.0).unwrap_or_default()),
        p95_ns: nanos(stats.percentile(95.0).unwrap_or_default()),
        p99_ns: nanos(stats.percentile(99.0).unwrap_or_default()),
    }
}

pub(crate) fn trace_record(trace: &Trace) -> TraceRecord {
    TraceRecord {
        id: trace.id().to_string(),
        perceived_ns: nanos(trace.perceived()),
        user_ns: nanos(trace.user()),
        system_ns: nanos(trace.system()),
        error: trace.error().map(|e| format!("{e:#}")),
    }
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
