use std::sync::Arc;
use std::time::Duration;

/// Scenario names double as their identity.
pub type ScenarioId = String;

/// Anything that can be traced is identified by the scenario it belongs to.
pub trait Identifiable {
    fn id(&self) -> &str;
}

impl Identifiable for str {
    fn id(&self) -> &str {
        self
    }
}

impl Identifiable for String {
    fn id(&self) -> &str {
        self.as_str()
    }
}

/// Outcome of one subprocess invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionInfo {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub user_time: Duration,
    pub system_time: Duration,
    pub wall_time: Duration,
}

/// One completed measurement of a scenario's command.
#[derive(Debug, Clone)]
pub struct Trace {
    id: ScenarioId,
    perceived: Duration,
    user: Duration,
    system: Duration,
    error: Option<Arc<anyhow::Error>>,
}

impl Trace {
    pub fn new(
        id: impl Into<ScenarioId>,
        perceived: Duration,
        user: Duration,
        system: Duration,
        error: Option<Arc<anyhow::Error>>,
    ) -> Self {
        Self {
            id: id.into(),
            perceived,
            user,
            system,
            error,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wall-clock time between the start and the end of the trace.
    pub fn perceived(&self) -> Duration {
        self.perceived
    }

    pub fn user(&self) -> Duration {
        self.user
    }

    pub fn system(&self) -> Duration {
        self.system
    }

    pub fn error(&self) -> Option<&anyhow::Error> {
        self.error.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
