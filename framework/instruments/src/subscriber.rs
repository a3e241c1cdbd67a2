use crate::stream::EventStream;
use anyhow::Context;
use lapse_core::prelude::{CountdownLatch, ShutdownHandle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub type HandleFn<T> = dyn Fn(T) -> anyhow::Result<()> + Send + Sync + 'static;

/// A single-use background consumer of an [EventStream].
///
/// [StreamSubscriber::subscribe] attaches a dedicated queue to the stream and starts a consumer
/// thread that hands each event to the handle function, one at a time and in the order they were
/// published. Errors from the handle function are logged and otherwise ignored.
///
/// Stopping is cooperative: [Unsubscribe::unsubscribe] signals the consumer, which then handles
/// every event still buffered in its queue before exiting. The call returns once that is done.
pub struct StreamSubscriber<T> {
    name: String,
    stream: EventStream<T>,
    handle_fn: Arc<HandleFn<T>>,
    subscribed: AtomicBool,
}

impl<T: Send + 'static> StreamSubscriber<T> {
    pub fn new<F>(name: impl Into<String>, stream: EventStream<T>, handle_fn: F) -> Self
    where
        F: Fn(T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            stream,
            handle_fn: Arc::new(handle_fn),
            subscribed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start consuming events. Returns once the consumer is running.
    ///
    /// # Panics
    ///
    /// If this subscriber has already been subscribed. A subscriber can only be used once.
    pub fn subscribe(&self) -> anyhow::Result<Unsubscribe> {
        if self.subscribed.swap(true, Ordering::SeqCst) {
            panic!("Subscriber [{}] is already subscribed", self.name);
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .context("Failed to create runtime for subscriber")?;

        let mut receiver = self.stream.attach();
        let shutdown_handle = ShutdownHandle::new();
        let mut shutdown_listener = shutdown_handle.new_listener();
        let started = Arc::new(CountdownLatch::new(1));
        let stopped = Arc::new(CountdownLatch::new(1));

        let name = self.name.clone();
        let handle_fn = self.handle_fn.clone();
        let thread_started = started.clone();
        let thread_stopped = stopped.clone();

        std::thread::Builder::new()
            .name(format!("subscriber-{}", self.name))
            .spawn(move || {
                let _stopped = CountDownOnDrop(thread_stopped);

                runtime.block_on(async move {
                    thread_started.count_down();

                    loop {
                        tokio::select! {
                            _ = shutdown_listener.wait_for_shutdown() => {
                                log::debug!("Unsubscribing {}", name);
                                break;
                            }
                            event = receiver.recv() => {
                                match event {
                                    Some(event) => handle_event(&name, handle_fn.as_ref(), event),
                                    None => break,
                                }
                            }
                        }
                    }

                    // Stop accepting new events, then handle whatever is still buffered,
                    // including sends that were already in flight when the queue closed.
                    receiver.close();
                    let mut drain_count = 0;
                    while let Some(event) = receiver.recv().await {
                        handle_event(&name, handle_fn.as_ref(), event);
                        drain_count += 1;
                    }

                    log::debug!("Drained {} remaining events for {}", drain_count, name);
                });
            })
            .context("Failed to spawn subscriber thread")?;

        started.wait();

        Ok(Unsubscribe {
            shutdown_handle,
            stopped,
            done: false,
        })
    }
}

fn handle_event<T>(name: &str, handle_fn: &HandleFn<T>, event: T) {
    if let Err(e) = handle_fn(event) {
        log::warn!("Subscriber {} failed to handle event: {:?}", name, e);
    }
}

struct CountDownOnDrop(Arc<CountdownLatch>);

impl Drop for CountDownOnDrop {
    fn drop(&mut self) {
        self.0.count_down();
    }
}

/// Stops a subscription, see [StreamSubscriber].
///
/// Dropping this handle unsubscribes as well, so the queue is drained on every exit path.
#[must_use = "dropping the handle unsubscribes immediately"]
pub struct Unsubscribe {
    shutdown_handle: ShutdownHandle,
    stopped: Arc<CountdownLatch>,
    done: bool,
}

impl Unsubscribe {
    /// Signal the consumer and block until it has drained its queue and exited.
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.done {
            return;
        }
        self.done = true;

        self.shutdown_handle.shutdown();
        self.stopped.wait();
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        self.stop();
    }
}
