use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::Context;
use lapse_core::prelude::AbortedError;
use lapse_instruments::report::{
    ReportHandler, ReportWriter, StreamReportHandler, SummaryReportHandler,
};
use lapse_instruments::Tracer;
use lapse_summary_model::RunSummary;

use crate::cli::LapseCli;
use crate::context::RunnerContext;
use crate::cpu::detect_cpu_clock;
use crate::definition::BenchmarkSpec;
use crate::executor::ProcessExecutor;
use crate::listener::{FailFastListener, Listener, ListenerChain, LoggingListener};
use crate::orchestrator::execute;
use crate::progress::ProgressListener;
use crate::shutdown::start_shutdown_listener;
use crate::types::LapseResult;

/// Run a complete benchmark as configured on the command line.
///
/// Report handlers are finalized on every exit path, so traces recorded before a failure or an
/// abort still make it into the reports.
pub fn run(cli: LapseCli) -> LapseResult<()> {
    let spec = cli.benchmark_spec()?;

    log::info!(
        "Running {} scenario(s) with {} execution(s) each",
        spec.scenarios.len(),
        spec.executions
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = start_shutdown_listener(&runtime)?;

    let run_summary = run_summary(&cli, &spec);
    log::debug!("Run id {}", run_summary.run_id);

    // Every trace of the run fits in the buffer, so a slow report never holds up the benchmark.
    let tracer = Tracer::new(spec.total_executions());

    let mut handlers = report_handlers(&cli, &tracer, run_summary)?;
    if let Err(e) = start_handlers(&mut handlers) {
        finalize_handlers(&mut handlers);
        return Err(e);
    }

    let mut listeners = ListenerChain::new().with(LoggingListener);
    if !cli.no_progress {
        listeners.push(Box::new(ProgressListener::new(spec.total_executions())));
    }
    let listener: Box<dyn Listener> = if spec.fail_fast {
        Box::new(FailFastListener::new(listeners, shutdown_handle.clone()))
    } else {
        Box::new(listeners)
    };

    let executor = ProcessExecutor::new(detect_cpu_clock(), cli.pipe_stdout);
    let ctx = RunnerContext::new(listener.as_ref(), &executor, &tracer, shutdown_handle);

    let result = execute(&spec, &ctx);

    finalize_handlers(&mut handlers);

    if let Err(e) = &result {
        if e.is::<AbortedError>() {
            log::warn!("{e}, reports only include the executions that completed");
        }
    }

    result
}

fn run_summary(cli: &LapseCli, spec: &BenchmarkSpec) -> RunSummary {
    let mut summary = RunSummary::new(
        cli.run_id.clone().unwrap_or_else(|| nanoid::nanoid!()),
        chrono::Utc::now().timestamp(),
        spec.executions,
        spec.alternate,
        spec.fail_fast,
        spec.scenarios.iter().map(|s| s.name.clone()).collect(),
        env!("CARGO_PKG_VERSION").to_string(),
    );

    for scenario in &spec.scenarios {
        for (key, value) in &scenario.env {
            summary.add_env(scenario.name.clone(), key.clone(), value.clone());
        }
    }

    summary
}

fn report_handlers(
    cli: &LapseCli,
    tracer: &Tracer,
    run_summary: RunSummary,
) -> LapseResult<Vec<Box<dyn ReportHandler>>> {
    let mut handlers: Vec<Box<dyn ReportHandler>> = Vec::new();

    let summary_writer: ReportWriter = match &cli.out {
        Some(path) => open_report(path)?,
        None => Box::new(std::io::stdout()),
    };
    handlers.push(Box::new(SummaryReportHandler::new(
        tracer.stream(),
        cli.format.into(),
        run_summary,
        summary_writer,
    )));

    if let Some(path) = &cli.raw_out {
        handlers.push(Box::new(StreamReportHandler::new(
            tracer.stream(),
            open_report(path)?,
        )));
    }

    Ok(handlers)
}

fn open_report(path: &Path) -> LapseResult<ReportWriter> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create report file {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn start_handlers(handlers: &mut [Box<dyn ReportHandler>]) -> LapseResult<()> {
    for handler in handlers.iter_mut() {
        let name = handler.name().to_string();
        handler
            .start()
            .with_context(|| format!("Failed to start the {name} report"))?;
    }

    Ok(())
}

/// Failures are logged so that one broken report doesn't prevent the others from being written.
fn finalize_handlers(handlers: &mut [Box<dyn ReportHandler>]) {
    for handler in handlers.iter_mut() {
        if let Err(e) = handler.finalize() {
            log::error!("Failed to write the {} report: {:?}", handler.name(), e);
        }
    }
}
