mod scenario_table;

use crate::report::summary_report::scenario_table::ScenarioRow;
use crate::report::{scenario_reports, ReportHandler, ReportWriter};
use crate::sink::TraceSink;
use crate::stream::EventStream;
use crate::summary::Summary;
use crate::trace::Trace;
use anyhow::Context;
use lapse_summary_model::{store_report, BenchmarkReport, RunSummary, ScenarioReport};
use std::io::Write;
use tabled::settings::Style;
use tabled::Table;

/// Encodings available for the end of run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryFormat {
    Text,
    Markdown,
    Json,
    Csv,
}

/// Accumulates every trace of the run and writes a summary when finalized.
pub struct SummaryReportHandler {
    sink: TraceSink,
    format: SummaryFormat,
    run: RunSummary,
    writer: ReportWriter,
}

impl SummaryReportHandler {
    pub fn new(
        stream: EventStream<Trace>,
        format: SummaryFormat,
        run: RunSummary,
        writer: ReportWriter,
    ) -> Self {
        Self {
            sink: TraceSink::new(stream),
            format,
            run,
            writer,
        }
    }

    pub fn summary(&self) -> Summary {
        self.sink.summary()
    }
}

impl ReportHandler for SummaryReportHandler {
    fn name(&self) -> &str {
        "summary"
    }

    fn start(&mut self) -> anyhow::Result<()> {
        self.sink.subscribe()
    }

    fn finalize(&mut self) -> anyhow::Result<()> {
        self.sink.unsubscribe();

        let summary = self.sink.summary();
        if summary.is_empty() {
            log::warn!("No executions were recorded, skipping the summary report");
            return Ok(());
        }

        write_summary(&summary, self.format, &self.run, &mut self.writer)?;
        self.writer
            .flush()
            .context("Failed to flush the summary report")
    }
}

/// Encode a summary in the given format.
pub fn write_summary<W: Write + ?Sized>(
    summary: &Summary,
    format: SummaryFormat,
    run: &RunSummary,
    writer: &mut W,
) -> anyhow::Result<()> {
    let reports = scenario_reports(summary);
    let written = match format {
        SummaryFormat::Text => write_table(&reports, run, false, writer),
        SummaryFormat::Markdown => write_table(&reports, run, true, writer),
        SummaryFormat::Json => {
            let report = BenchmarkReport::new(
                run.clone(),
                summary.captured_at().timestamp_millis(),
                reports,
            );
            store_report(&report, writer)
        }
        SummaryFormat::Csv => write_csv(&reports, writer),
    };

    written.context("Failed to write the summary report")
}

fn write_table<W: Write + ?Sized>(
    reports: &[ScenarioReport],
    run: &RunSummary,
    markdown: bool,
    writer: &mut W,
) -> anyhow::Result<()> {
    let rows = reports
        .iter()
        .map(|report| ScenarioRow {
            scenario: report.id.clone(),
            count: report.count,
            mean_ms: millis(report.perceived.mean_ns),
            median_ms: millis(report.perceived.median_ns),
            min_ms: millis(report.perceived.min_ns),
            max_ms: millis(report.perceived.max_ns),
            std_dev_ms: millis(report.perceived.std_dev_ns),
            p90_ms: millis(report.perceived.p90_ns),
            p95_ms: millis(report.perceived.p95_ns),
            p99_ms: millis(report.perceived.p99_ns),
            user_mean_ms: millis(report.user.mean_ns),
            system_mean_ms: millis(report.system.mean_ns),
            error_rate: report.error_rate,
        })
        .collect::<Vec<_>>();

    writeln!(
        writer,
        "\nSummary of run {} ({} executions per scenario{})",
        run.run_id,
        run.executions,
        if run.alternate { ", alternating" } else { "" }
    )?;

    let mut table = Table::new(rows);
    if markdown {
        table.with(Style::markdown());
    } else {
        table.with(Style::modern());
    }

    writeln!(writer, "{table}")?;
    Ok(())
}

fn write_csv<W: Write + ?Sized>(reports: &[ScenarioReport], writer: &mut W) -> anyhow::Result<()> {
    writeln!(
        writer,
        "scenario,count,error_rate,mean_ns,median_ns,min_ns,max_ns,std_dev_ns,p90_ns,p95_ns,p99_ns,user_mean_ns,system_mean_ns"
    )?;

    for report in reports {
        let p = &report.perceived;
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{},{},{},{},{}",
            csv_field(&report.id),
            report.count,
            report.error_rate,
            p.mean_ns,
            p.median_ns,
            p.min_ns,
            p.max_ns,
            p.std_dev_ns,
            p.p90_ns,
            p.p95_ns,
            p.p99_ns,
            report.user.mean_ns,
            report.system.mean_ns,
        )?;
    }

    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn millis(nanos: u64) -> f64 {
    nanos as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapse_summary_model::load_report;
    use std::time::Duration;

    fn sample_summary() -> Summary {
        let traces = (1..=4).map(|i| {
            Trace::new(
                "sleep, briefly",
                Duration::from_millis(i),
                Duration::from_micros(200),
                Duration::from_micros(100),
                None,
            )
        });
        Summary::from_traces(traces)
    }

    fn sample_run() -> RunSummary {
        RunSummary::new(
            "test-run".to_string(),
            0,
            4,
            false,
            false,
            vec!["sleep, briefly".to_string()],
            "0.1.0".to_string(),
        )
    }

    fn render(format: SummaryFormat) -> String {
        let mut out = Vec::new();
        write_summary(&sample_summary(), format, &sample_run(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn text_table_lists_scenarios() {
        let text = render(SummaryFormat::Text);

        assert!(text.contains("Summary of run test-run"));
        assert!(text.contains("sleep, briefly"));
        assert!(text.contains("2.500"));
        assert!(text.contains("0.0%"));
    }

    #[test]
    fn markdown_table_uses_pipes() {
        let markdown = render(SummaryFormat::Markdown);
        assert!(markdown.lines().any(|line| line.starts_with("| Scenario")));
    }

    #[test]
    fn csv_quotes_ids() {
        let csv = render(SummaryFormat::Csv);
        let lines = csv.lines().collect::<Vec<_>>();

        assert_eq!(2, lines.len());
        assert!(lines[0].starts_with("scenario,count,error_rate"));
        assert!(lines[1].starts_with("\"sleep, briefly\",4,0,2500000,"));
    }

    #[test]
    fn json_round_trips_through_model() {
        let json = render(SummaryFormat::Json);
        let report = load_report(json.as_bytes()).unwrap();

        assert_eq!("test-run", report.run.run_id);
        assert_eq!(report.run.fingerprint(), report.fingerprint);
        assert_eq!(4, report.scenario("sleep, briefly").unwrap().count);
    }

    #[test]
    fn empty_run_writes_nothing() {
        let tracer = crate::tracer::Tracer::new(1);
        let out = SharedBuffer::default();
        let mut handler = SummaryReportHandler::new(
            tracer.stream(),
            SummaryFormat::Text,
            sample_run(),
            Box::new(out.clone()),
        );

        handler.start().unwrap();
        handler.finalize().unwrap();

        assert!(out.0.lock().is_empty());
    }

    #[test]
    fn handler_reports_traces_published_while_subscribed() {
        let tracer = crate::tracer::Tracer::new(8);
        let out = SharedBuffer::default();
        let mut handler = SummaryReportHandler::new(
            tracer.stream(),
            SummaryFormat::Csv,
            sample_run(),
            Box::new(out.clone()),
        );

        handler.start().unwrap();
        for _ in 0..3 {
            tracer.start("a").end(None, None);
        }
        handler.finalize().unwrap();

        let written = String::from_utf8(out.0.lock().clone()).unwrap();
        assert!(written.lines().nth(1).unwrap().starts_with("a,3,"));
        assert_eq!(3, handler.summary().perceived_time_stats("a").unwrap().count());
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(std::sync::Arc<parking_lot::Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
