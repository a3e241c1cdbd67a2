mod sink;
mod stats;
mod stream;
mod subscriber;
mod summary;
mod trace;
mod tracer;

pub mod report;

pub use sink::TraceSink;
pub use stats::{Stats, StatsError};
pub use stream::EventStream;
pub use subscriber::{HandleFn, StreamSubscriber, Unsubscribe};
pub use summary::{ScenarioStats, Summary};
pub use trace::{ExecutionInfo, Identifiable, ScenarioId, Trace};
pub use tracer::{PendingTrace, Tracer};
