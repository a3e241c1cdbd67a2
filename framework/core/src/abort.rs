/// Returned when a benchmark run stops before all of its planned work was done.
///
/// This is raised by the orchestrator when the shared shutdown handle has been triggered, either
/// by a fail-fast listener reacting to the first reported error or by an interrupt from the user.
/// Callers should still finalize their report handlers so that buffered traces are drained.
#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
#[display("{msg}")]
pub struct AbortedError {
    msg: String,
}

impl AbortedError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { msg: reason.into() }
    }
}

impl Default for AbortedError {
    fn default() -> Self {
        Self {
            msg: "Benchmark aborted".to_string(),
        }
    }
}
