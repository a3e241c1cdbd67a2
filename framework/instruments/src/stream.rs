use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};

/// A bounded event stream that fans every published event out to all attached subscribers.
///
/// Each subscriber gets its own queue of [EventStream::buffer_size] events, so subscribers never
/// compete for events. Publishing blocks while any attached queue is full. Queues whose receiver
/// has gone away are dropped on the next publish.
pub struct EventStream<T> {
    hub: Arc<StreamHub<T>>,
}

struct StreamHub<T> {
    buffer_size: usize,
    queues: Mutex<Vec<Sender<T>>>,
}

impl<T> Clone for EventStream<T> {
    fn clone(&self) -> Self {
        Self {
            hub: self.hub.clone(),
        }
    }
}

impl<T> std::fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("buffer_size", &self.hub.buffer_size)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<T> EventStream<T> {
    /// The largest queue a bounded tokio channel can be created with.
    pub const MAX_BUFFER_SIZE: usize = tokio::sync::Semaphore::MAX_PERMITS;

    /// The buffer size is clamped to `1..=`[EventStream::MAX_BUFFER_SIZE].
    pub fn new(buffer_size: usize) -> Self {
        Self {
            hub: Arc::new(StreamHub {
                buffer_size: buffer_size.clamp(1, Self::MAX_BUFFER_SIZE),
                queues: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.hub.buffer_size
    }

    /// Number of attached queues that are still being consumed.
    pub fn subscriber_count(&self) -> usize {
        self.hub
            .queues
            .lock()
            .iter()
            .filter(|queue| !queue.is_closed())
            .count()
    }

    /// Attach a new dedicated queue. Only events published after this call are delivered to it.
    pub(crate) fn attach(&self) -> Receiver<T> {
        let (sender, receiver) = tokio::sync::mpsc::channel(self.hub.buffer_size);
        self.hub.queues.lock().push(sender);
        receiver
    }
}

impl<T: Clone> EventStream<T> {
    /// Deliver an event to every attached queue, in attachment order. Returns the number of
    /// queues that accepted it.
    ///
    /// # Panics
    ///
    /// Must not be called from within an async runtime, publishing blocks the calling thread
    /// while a queue is full.
    pub fn publish(&self, event: T) -> usize {
        let queues = self.hub.queues.lock().clone();
        if queues.is_empty() {
            log::trace!("Event published with no subscribers attached");
            return 0;
        }

        let mut delivered = 0;
        for queue in &queues {
            if queue.blocking_send(event.clone()).is_ok() {
                delivered += 1;
            }
        }

        if delivered < queues.len() {
            self.hub.queues.lock().retain(|queue| !queue.is_closed());
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_queue_receives_every_event() {
        let stream = EventStream::new(4);
        let mut first = stream.attach();
        let mut second = stream.attach();

        assert_eq!(2, stream.publish(1));
        assert_eq!(2, stream.publish(2));

        assert_eq!(Ok(1), first.try_recv());
        assert_eq!(Ok(2), first.try_recv());
        assert_eq!(Ok(1), second.try_recv());
        assert_eq!(Ok(2), second.try_recv());
    }

    #[test]
    fn late_queue_only_sees_later_events() {
        let stream = EventStream::new(4);
        let mut early = stream.attach();
        stream.publish("before");

        let mut late = stream.attach();
        stream.publish("after");

        assert_eq!(Ok("before"), early.try_recv());
        assert_eq!(Ok("after"), early.try_recv());
        assert_eq!(Ok("after"), late.try_recv());
        assert!(late.try_recv().is_err());
    }

    #[test]
    fn closed_queues_are_pruned() {
        let stream = EventStream::new(1);
        let kept = stream.attach();
        let dropped = stream.attach();
        assert_eq!(2, stream.subscriber_count());

        drop(dropped);
        assert_eq!(1, stream.subscriber_count());

        assert_eq!(1, stream.publish(()));
        assert_eq!(1, stream.hub.queues.lock().len());
        drop(kept);
    }

    #[test]
    fn zero_buffer_is_raised_to_one() {
        let stream = EventStream::<u8>::new(0);
        assert_eq!(1, stream.buffer_size());
    }

    #[test]
    fn oversized_buffer_is_clamped() {
        let stream = EventStream::<u8>::new(usize::MAX);
        assert_eq!(EventStream::<u8>::MAX_BUFFER_SIZE, stream.buffer_size());

        let mut queue = stream.attach();
        stream.publish(1);
        assert_eq!(Ok(1), queue.try_recv());
    }
}
