/// Recommended error type for code built on the runner. Hook and command failures are reported
/// through listeners, this is for errors that stop the run.
pub type LapseResult<T> = anyhow::Result<T>;
