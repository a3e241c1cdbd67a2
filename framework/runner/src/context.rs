use lapse_core::prelude::ShutdownHandle;
use lapse_instruments::Tracer;

use crate::executor::CommandExecutor;
use crate::listener::Listener;
use crate::types::LapseResult;

/// The collaborators a benchmark run is executed with.
pub struct RunnerContext<'a> {
    listener: &'a dyn Listener,
    executor: &'a dyn CommandExecutor,
    tracer: &'a Tracer,
    shutdown_handle: ShutdownHandle,
}

impl<'a> RunnerContext<'a> {
    pub fn new(
        listener: &'a dyn Listener,
        executor: &'a dyn CommandExecutor,
        tracer: &'a Tracer,
        shutdown_handle: ShutdownHandle,
    ) -> Self {
        Self {
            listener,
            executor,
            tracer,
            shutdown_handle,
        }
    }

    pub fn listener(&self) -> &dyn Listener {
        self.listener
    }

    pub fn executor(&self) -> &dyn CommandExecutor {
        self.executor
    }

    pub fn tracer(&self) -> &Tracer {
        self.tracer
    }

    pub fn shutdown_handle(&self) -> &ShutdownHandle {
        &self.shutdown_handle
    }

    /// Fails with an [lapse_core::prelude::AbortedError] once the run has been asked to stop.
    pub(crate) fn check_continue(&self) -> LapseResult<()> {
        if self.shutdown_handle.is_shutdown() {
            return Err(lapse_core::prelude::AbortedError::default().into());
        }
        Ok(())
    }
}
