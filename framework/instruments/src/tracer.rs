use crate::stream::EventStream;
use crate::trace::{ExecutionInfo, Identifiable, ScenarioId, Trace};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Turns start/end measurement pairs into [Trace] events on a shared bounded stream.
///
/// The buffer should be sized to the largest number of traces a run can produce, which is the
/// number of executions times the number of scenarios. Otherwise a slow subscriber can block the
/// benchmark itself when the stream fills up.
#[derive(Debug, Clone)]
pub struct Tracer {
    stream: EventStream<Trace>,
}

impl Tracer {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            stream: EventStream::new(buffer_size),
        }
    }

    /// The stream traces are published to. Subscribe before the first trace is started.
    pub fn stream(&self) -> EventStream<Trace> {
        self.stream.clone()
    }

    pub fn start<I: Identifiable + ?Sized>(&self, subject: &I) -> PendingTrace {
        PendingTrace {
            id: subject.id().to_string(),
            stream: self.stream.clone(),
            started: Instant::now(),
        }
    }
}

/// A started measurement. Consumed by [PendingTrace::end], so each start produces at most one
/// trace.
#[must_use = "a trace is only published when it is ended"]
pub struct PendingTrace {
    id: ScenarioId,
    stream: EventStream<Trace>,
    started: Instant,
}

impl PendingTrace {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Complete the measurement and publish it.
    ///
    /// CPU times are taken from `info`, which is `None` when the process never started, in which
    /// case they are recorded as zero.
    pub fn end(self, info: Option<&ExecutionInfo>, error: Option<Arc<anyhow::Error>>) {
        let perceived = self.started.elapsed();
        let (user, system) = info
            .map(|info| (info.user_time, info.system_time))
            .unwrap_or((Duration::ZERO, Duration::ZERO));

        self.stream
            .publish(Trace::new(self.id, perceived, user, system, error));
    }
}
