use tokio::sync::watch::{Receiver, Sender};

/// Shared cancellation signal for a benchmark run.
///
/// The signal is level-triggered: once [ShutdownHandle::shutdown] has been called every existing
/// and future listener observes it, so it can be polled between steps of a run as well as awaited.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<bool>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: tokio::sync::watch::channel(false).0,
        }
    }

    pub fn shutdown(&self) {
        let changed = self.sender.send_if_modified(|triggered| {
            let was_triggered = *triggered;
            *triggered = true;
            !was_triggered
        });

        if changed {
            log::debug!("Shutdown signal sent");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn new_listener(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ShutdownListener {
    receiver: Receiver<bool>,
}

impl ShutdownListener {
    /// Point in time check if the shutdown signal has been sent.
    pub fn should_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Wait for the shutdown signal. Safe to race against other futures in a `select!`.
    ///
    /// Also resolves if every [ShutdownHandle] has been dropped, because the signal can then never
    /// be sent.
    pub async fn wait_for_shutdown(&mut self) {
        let result = self.receiver.wait_for(|triggered| *triggered).await.map(|_| ());
        if result.is_err() {
            log::trace!("Shutdown handle dropped, treating as shutdown");
        }
    }
}
