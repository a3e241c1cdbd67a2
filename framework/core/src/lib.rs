mod abort;
mod latch;
mod shutdown;

pub mod prelude {
    pub use crate::abort::AbortedError;
    pub use crate::latch::CountdownLatch;
    pub use crate::shutdown::{ShutdownHandle, ShutdownListener};
}
