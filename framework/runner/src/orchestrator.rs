use std::sync::Arc;

use lapse_core::prelude::AbortedError;
use lapse_instruments::Identifiable;

use crate::context::RunnerContext;
use crate::definition::{BenchmarkSpec, CommandSpec, ScenarioSpec};
use crate::types::LapseResult;

/// Run every scenario of the benchmark, `spec.executions` times each.
///
/// Scenarios run one after another, or round-robin when `spec.alternate` is set. Only one command
/// is ever running at a time. Failures of hooks and measured commands are reported to the listener
/// and recorded on the trace, they do not stop the run by themselves. The run stops early, with an
/// [AbortedError], when the shutdown handle in the context is triggered.
pub fn execute(spec: &BenchmarkSpec, ctx: &RunnerContext<'_>) -> LapseResult<()> {
    ctx.listener().on_benchmark_start();

    let result = if spec.alternate {
        run_alternating(spec, ctx)
    } else {
        run_sequential(spec, ctx)
    };

    ctx.listener().on_benchmark_end();

    result
}

fn run_sequential(spec: &BenchmarkSpec, ctx: &RunnerContext<'_>) -> LapseResult<()> {
    for scenario in &spec.scenarios {
        for execution in 0..spec.executions {
            execute_scenario(
                scenario,
                ctx,
                execution == 0,
                execution + 1 == spec.executions,
            )?;
        }
    }

    Ok(())
}

fn run_alternating(spec: &BenchmarkSpec, ctx: &RunnerContext<'_>) -> LapseResult<()> {
    for round in 0..spec.executions {
        for scenario in &spec.scenarios {
            execute_scenario(scenario, ctx, round == 0, round + 1 == spec.executions)?;
        }
    }

    Ok(())
}

/// One measured execution, with `beforeAll` when `first` and `afterAll` when `last`.
fn execute_scenario(
    scenario: &ScenarioSpec,
    ctx: &RunnerContext<'_>,
    first: bool,
    last: bool,
) -> LapseResult<()> {
    ctx.check_continue()?;

    if first {
        run_hook(scenario, ctx, "beforeAll", scenario.before_all.as_ref())?;
    }

    ctx.listener().on_scenario_start(scenario.id());
    let measured = run_measured(scenario, ctx);
    ctx.listener().on_scenario_end(scenario.id());
    measured?;

    if last {
        run_hook(scenario, ctx, "afterAll", scenario.after_all.as_ref())?;
    }

    Ok(())
}

fn run_measured(scenario: &ScenarioSpec, ctx: &RunnerContext<'_>) -> LapseResult<()> {
    let id = scenario.id();

    run_hook(scenario, ctx, "beforeEach", scenario.before_each.as_ref())?;
    ctx.check_continue()?;

    let exec_fn = ctx.executor().execute_fn(
        ctx.shutdown_handle(),
        &scenario.command,
        scenario.working_dir.as_deref(),
        &scenario.env,
    );

    let pending = ctx.tracer().start(scenario);
    let result = exec_fn();

    if result.info.is_none() && is_aborted(result.error.as_ref()) {
        // Interrupted before the process was launched, there is nothing to record.
        return Err(result
            .error
            .unwrap_or_else(|| AbortedError::default().into()));
    }

    let error = result.error.map(Arc::new);
    pending.end(result.info.as_ref(), error.clone());
    if let Some(e) = &error {
        ctx.listener().on_error(id, e);
    }

    ctx.check_continue()?;
    run_hook(scenario, ctx, "afterEach", scenario.after_each.as_ref())
}

fn run_hook(
    scenario: &ScenarioSpec,
    ctx: &RunnerContext<'_>,
    label: &str,
    hook: Option<&CommandSpec>,
) -> LapseResult<()> {
    let Some(hook) = hook else {
        return Ok(());
    };

    ctx.check_continue()?;
    ctx.listener()
        .on_message_fmt(scenario.id(), format_args!("running {label} hook"));

    let result = ctx.executor().execute_fn(
        ctx.shutdown_handle(),
        hook,
        scenario.working_dir.as_deref(),
        &scenario.env,
    )();

    if let Some(e) = result.error {
        if is_aborted(Some(&e)) {
            return Err(e);
        }
        ctx.listener()
            .on_error(scenario.id(), &e.context(format!("{label} hook failed")));
    }

    ctx.check_continue()
}

fn is_aborted(error: Option<&anyhow::Error>) -> bool {
    error.is_some_and(|e| e.is::<AbortedError>())
}
