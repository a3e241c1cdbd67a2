use std::fmt;

use lapse_core::prelude::ShutdownHandle;

/// Receives benchmark lifecycle notifications.
///
/// Notifications are delivered synchronously on the thread running the benchmark, so
/// implementations should return quickly. Every method has a no-op default.
pub trait Listener {
    fn on_benchmark_start(&self) {}

    fn on_benchmark_end(&self) {}

    fn on_scenario_start(&self, _id: &str) {}

    fn on_scenario_end(&self, _id: &str) {}

    fn on_message(&self, _id: &str, _message: &str) {}

    fn on_message_fmt(&self, id: &str, args: fmt::Arguments<'_>) {
        match args.as_str() {
            Some(message) => self.on_message(id, message),
            None => self.on_message(id, &args.to_string()),
        }
    }

    fn on_error(&self, _id: &str, _error: &anyhow::Error) {}
}

/// Writes every notification to the log.
#[derive(Debug, Default)]
pub struct LoggingListener;

impl Listener for LoggingListener {
    fn on_benchmark_start(&self) {
        log::info!("Benchmark started");
    }

    fn on_benchmark_end(&self) {
        log::info!("Benchmark finished");
    }

    fn on_scenario_start(&self, id: &str) {
        log::debug!("[{id}] execution started");
    }

    fn on_scenario_end(&self, id: &str) {
        log::debug!("[{id}] execution finished");
    }

    fn on_message(&self, id: &str, message: &str) {
        log::debug!("[{id}] {message}");
    }

    fn on_error(&self, id: &str, error: &anyhow::Error) {
        log::error!("[{id}] {error:#}");
    }
}

/// Forwards to an inner listener and stops the run at the first error.
#[derive(Debug)]
pub struct FailFastListener<L> {
    inner: L,
    shutdown: ShutdownHandle,
}

impl<L: Listener> FailFastListener<L> {
    pub fn new(inner: L, shutdown: ShutdownHandle) -> Self {
        Self { inner, shutdown }
    }
}

impl<L: Listener> Listener for FailFastListener<L> {
    fn on_benchmark_start(&self) {
        self.inner.on_benchmark_start();
    }

    fn on_benchmark_end(&self) {
        self.inner.on_benchmark_end();
    }

    fn on_scenario_start(&self, id: &str) {
        self.inner.on_scenario_start(id);
    }

    fn on_scenario_end(&self, id: &str) {
        self.inner.on_scenario_end(id);
    }

    fn on_message(&self, id: &str, message: &str) {
        self.inner.on_message(id, message);
    }

    fn on_message_fmt(&self, id: &str, args: fmt::Arguments<'_>) {
        self.inner.on_message_fmt(id, args);
    }

    fn on_error(&self, id: &str, error: &anyhow::Error) {
        self.inner.on_error(id, error);
        if !self.shutdown.is_shutdown() {
            log::warn!("Stopping the benchmark after the first failure in [{id}]");
            self.shutdown.shutdown();
        }
    }
}

/// Delivers every notification to each listener in turn.
#[derive(Default)]
pub struct ListenerChain {
    listeners: Vec<Box<dyn Listener>>,
}

impl ListenerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, listener: impl Listener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    pub fn push(&mut self, listener: Box<dyn Listener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl Listener for ListenerChain {
    fn on_benchmark_start(&self) {
        self.listeners.iter().for_each(|l| l.on_benchmark_start());
    }

    fn on_benchmark_end(&self) {
        self.listeners.iter().for_each(|l| l.on_benchmark_end());
    }

    fn on_scenario_start(&self, id: &str) {
        self.listeners.iter().for_each(|l| l.on_scenario_start(id));
    }

    fn on_scenario_end(&self, id: &str) {
        self.listeners.iter().for_each(|l| l.on_scenario_end(id));
    }

    fn on_message(&self, id: &str, message: &str) {
        self.listeners.iter().for_each(|l| l.on_message(id, message));
    }

    fn on_message_fmt(&self, id: &str, args: fmt::Arguments<'_>) {
        self.listeners.iter().for_each(|l| l.on_message_fmt(id, args));
    }

    fn on_error(&self, id: &str, error: &anyhow::Error) {
        self.listeners.iter().for_each(|l| l.on_error(id, error));
    }
}
