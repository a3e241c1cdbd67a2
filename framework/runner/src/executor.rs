use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use lapse_core::prelude::{AbortedError, ShutdownHandle};
use lapse_instruments::ExecutionInfo;

use crate::cpu::{CpuClock, CpuTimes};
use crate::definition::CommandSpec;
use crate::types::LapseResult;

/// The outcome of running one command.
///
/// `info` is `None` when the process never started. A process that ran but exited with a
/// non-zero status has both `info` and `error` set.
#[derive(Debug, Default)]
pub struct ExecutionResult {
    pub info: Option<ExecutionInfo>,
    pub error: Option<anyhow::Error>,
}

impl ExecutionResult {
    pub fn ok(info: ExecutionInfo) -> Self {
        Self {
            info: Some(info),
            error: None,
        }
    }

    pub fn failed(info: ExecutionInfo, error: anyhow::Error) -> Self {
        Self {
            info: Some(info),
            error: Some(error),
        }
    }

    pub fn not_started(error: anyhow::Error) -> Self {
        Self {
            info: None,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// A fully configured command, waiting to be launched.
pub type ExecCommandFn<'a> = Box<dyn FnOnce() -> ExecutionResult + 'a>;

/// Prepares commands for execution.
///
/// Preparing and launching are separate steps so that the caller can start its own timing
/// immediately before the process is launched rather than while it is being configured.
pub trait CommandExecutor {
    fn execute_fn<'a>(
        &'a self,
        shutdown: &ShutdownHandle,
        command: &'a CommandSpec,
        default_working_dir: Option<&'a Path>,
        env: &'a BTreeMap<String, String>,
    ) -> ExecCommandFn<'a>;
}

/// Runs commands as child processes, one at a time, to completion.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    cpu_clock: Arc<dyn CpuClock>,
    pipe_output: bool,
}

impl ProcessExecutor {
    /// When `pipe_output` is false the child's stdout and stderr are discarded.
    pub fn new(cpu_clock: Arc<dyn CpuClock>, pipe_output: bool) -> Self {
        Self {
            cpu_clock,
            pipe_output,
        }
    }

    fn run(
        &self,
        command: &CommandSpec,
        working_dir: Option<PathBuf>,
        env: &BTreeMap<String, String>,
    ) -> ExecutionResult {
        let Some((program, args)) = command.cmd.split_first() else {
            return ExecutionResult::not_started(anyhow::anyhow!("Cannot run an empty command"));
        };

        let mut process = Command::new(program);
        process.args(args).envs(env).stdin(Stdio::null());
        if let Some(dir) = &working_dir {
            process.current_dir(dir);
        }
        if !self.pipe_output {
            process.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let cpu_before = self.cpu_clock.children_times();
        let started = Instant::now();

        let status = match process.spawn().and_then(|mut child| child.wait()) {
            Ok(status) => status,
            Err(e) => {
                return ExecutionResult::not_started(anyhow::Error::new(e).context(format!(
                    "Failed to run '{}'{}",
                    command.cmd.join(" "),
                    working_dir
                        .map(|d| format!(" in {}", d.display()))
                        .unwrap_or_default()
                )));
            }
        };

        let wall_time = started.elapsed();
        let cpu = match (cpu_before, self.cpu_clock.children_times()) {
            (Some(before), Some(after)) => after.saturating_sub(before),
            _ => CpuTimes::default(),
        };

        let info = ExecutionInfo {
            exit_code: status.code(),
            user_time: cpu.user,
            system_time: cpu.system,
            wall_time,
        };

        if status.success() {
            ExecutionResult::ok(info)
        } else {
            log::debug!("'{}' exited with {}", command.cmd.join(" "), status);
            ExecutionResult::failed(
                info,
                anyhow::anyhow!("'{}' exited with {}", command.cmd.join(" "), status),
            )
        }
    }
}

impl CommandExecutor for ProcessExecutor {
    fn execute_fn<'a>(
        &'a self,
        shutdown: &ShutdownHandle,
        command: &'a CommandSpec,
        default_working_dir: Option<&'a Path>,
        env: &'a BTreeMap<String, String>,
    ) -> ExecCommandFn<'a> {
        let shutdown = shutdown.clone();
        Box::new(move || {
            if shutdown.is_shutdown() {
                return ExecutionResult::not_started(AbortedError::default().into());
            }

            let working_dir =
                match resolve_working_dir(command.working_dir.as_deref(), default_working_dir) {
                    Ok(dir) => dir,
                    Err(e) => return ExecutionResult::not_started(e),
                };

            self.run(command, working_dir, env)
        })
    }
}

/// The command's own working directory wins over the scenario default. `None` means the current
/// directory of this process.
pub fn resolve_working_dir(
    explicit: Option<&Path>,
    default: Option<&Path>,
) -> LapseResult<Option<PathBuf>> {
    explicit.or(default).map(expand_home).transpose()
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> LapseResult<PathBuf> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };

    let home = std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .context("Cannot expand '~', HOME is not set")?;

    Ok(PathBuf::from(home).join(rest))
}
