use crate::stream::EventStream;
use crate::subscriber::{StreamSubscriber, Unsubscribe};
use crate::summary::Summary;
use crate::trace::{ScenarioId, Trace};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Accumulates traces by scenario from a stream and hands out [Summary] snapshots.
///
/// A summary can be taken at any time, but it is only guaranteed to contain every published trace
/// once [TraceSink::unsubscribe] has returned.
pub struct TraceSink {
    accumulator: Arc<RwLock<Accumulator>>,
    subscriber: StreamSubscriber<Trace>,
    subscription: Mutex<Option<Unsubscribe>>,
}

struct Accumulator {
    ids: Vec<ScenarioId>,
    traces: HashMap<ScenarioId, Vec<Trace>>,
    updated_at: DateTime<Utc>,
}

impl Accumulator {
    fn add(&mut self, trace: Trace) {
        match self.traces.entry(trace.id().to_string()) {
            std::collections::hash_map::Entry::Vacant(entry) => {
                self.ids.push(entry.key().clone());
                entry.insert(vec![trace]);
            }
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                entry.get_mut().push(trace);
            }
        }
        self.updated_at = Utc::now();
    }
}

impl TraceSink {
    pub fn new(stream: EventStream<Trace>) -> Self {
        let accumulator = Arc::new(RwLock::new(Accumulator {
            ids: Vec::new(),
            traces: HashMap::new(),
            updated_at: Utc::now(),
        }));

        let writer = accumulator.clone();
        let subscriber = StreamSubscriber::new("trace-sink", stream, move |trace: Trace| {
            writer.write().add(trace);
            Ok(())
        });

        Self {
            accumulator,
            subscriber,
            subscription: Mutex::new(None),
        }
    }

    /// Start accumulating.
    ///
    /// # Panics
    ///
    /// If the sink has already been subscribed.
    pub fn subscribe(&self) -> anyhow::Result<()> {
        let unsubscribe = self.subscriber.subscribe()?;
        *self.subscription.lock() = Some(unsubscribe);
        Ok(())
    }

    /// Stop accumulating once every buffered trace has been added. Does nothing if the sink is
    /// not subscribed.
    pub fn unsubscribe(&self) {
        let subscription = self.subscription.lock().take();
        if let Some(unsubscribe) = subscription {
            unsubscribe.unsubscribe();
        }
    }

    pub fn summary(&self) -> Summary {
        let accumulator = self.accumulator.read();
        Summary::new(
            accumulator.updated_at,
            &accumulator.ids,
            &accumulator.traces,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::Tracer;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[test]
    fn summary_holds_every_trace_after_unsubscribe() {
        let tracer = Tracer::new(64);
        let sink = TraceSink::new(tracer.stream());
        sink.subscribe().unwrap();

        let mut expected = BTreeMap::new();
        for i in 0..60 {
            let id = format!("scenario-{}", i % 3);
            *expected.entry(id.clone()).or_insert(0usize) += 1;
            tracer.start(&id).end(None, None);
        }
        sink.unsubscribe();

        let summary = sink.summary();
        let mut ids = summary.ids().to_vec();
        ids.sort();
        assert_eq!(expected.keys().cloned().collect::<Vec<_>>(), ids);
        for (id, count) in expected {
            assert_eq!(count, summary.perceived_time_stats(&id).unwrap().count());
            assert_eq!(count, summary.user_time_stats(&id).unwrap().count());
            assert_eq!(count, summary.system_time_stats(&id).unwrap().count());
        }
    }

    #[test]
    fn repeated_summaries_are_equal() {
        let tracer = Tracer::new(4);
        let sink = TraceSink::new(tracer.stream());
        sink.subscribe().unwrap();
        tracer.start("a").end(None, None);
        tracer.start("b").end(None, None);
        sink.unsubscribe();

        assert_eq!(sink.summary(), sink.summary());
    }

    #[test]
    fn subscribe_with_largest_possible_buffer() {
        let tracer = Tracer::new(usize::MAX);
        let sink = TraceSink::new(tracer.stream());
        sink.subscribe().unwrap();
        tracer.start("a").end(None, None);
        sink.unsubscribe();

        assert_eq!(1, sink.summary().perceived_time_stats("a").unwrap().count());
    }

    #[test]
    fn unsubscribe_without_subscription_is_a_noop() {
        let sink = TraceSink::new(Tracer::new(1).stream());
        sink.unsubscribe();
        assert!(sink.summary().is_empty());
    }

    #[test]
    fn summary_is_frozen() {
        let tracer = Tracer::new(4);
        let sink = TraceSink::new(tracer.stream());
        sink.subscribe().unwrap();
        tracer.start("a").end(None, None);

        // Wait for the first trace to land, then snapshot.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while sink.summary().is_empty() && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        let before = sink.summary();

        tracer.start("a").end(None, None);
        sink.unsubscribe();

        assert_eq!(1, before.perceived_time_stats("a").unwrap().count());
        assert_eq!(2, sink.summary().perceived_time_stats("a").unwrap().count());
    }
}
