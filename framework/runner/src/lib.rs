mod cli;
mod context;
mod cpu;
mod definition;
mod executor;
mod init;
mod listener;
mod orchestrator;
mod progress;
mod run;
mod shutdown;
mod types;

pub mod prelude {
    pub use crate::cli::{LapseCli, ReportFormat};
    pub use crate::context::RunnerContext;
    #[cfg(unix)]
    pub use crate::cpu::RusageCpuClock;
    pub use crate::cpu::{detect_cpu_clock, CpuClock, CpuTimes, UnsupportedCpuClock};
    pub use crate::definition::{BenchmarkSpec, CommandSpec, ScenarioSpec};
    pub use crate::executor::{
        expand_home, resolve_working_dir, CommandExecutor, ExecCommandFn, ExecutionResult,
        ProcessExecutor,
    };
    pub use crate::init::init;
    pub use crate::listener::{FailFastListener, Listener, ListenerChain, LoggingListener};
    pub use crate::orchestrator::execute;
    pub use crate::progress::ProgressListener;
    pub use crate::run::run;
    pub use crate::types::LapseResult;

    /// Re-export of the instruments used to observe a run.
    pub use lapse_instruments::{ExecutionInfo, Summary, Trace, TraceSink, Tracer};
    pub use lapse_core::prelude::{AbortedError, ShutdownHandle};
}
