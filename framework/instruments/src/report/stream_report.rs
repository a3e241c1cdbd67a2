use crate::report::{trace_record, ReportHandler, ReportWriter};
use crate::stream::EventStream;
use crate::subscriber::{StreamSubscriber, Unsubscribe};
use crate::trace::Trace;
use anyhow::Context;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

/// Writes every trace as a JSON line as soon as it arrives.
pub struct StreamReportHandler {
    subscriber: StreamSubscriber<Trace>,
    writer: Arc<Mutex<ReportWriter>>,
    subscription: Option<Unsubscribe>,
}

impl StreamReportHandler {
    pub fn new(stream: EventStream<Trace>, writer: ReportWriter) -> Self {
        let writer = Arc::new(Mutex::new(writer));

        let record_writer = writer.clone();
        let subscriber = StreamSubscriber::new("raw-report", stream, move |trace: Trace| {
            let mut writer = record_writer.lock();
            serde_json::to_writer(&mut *writer, &trace_record(&trace))
                .context("Failed to encode trace")?;
            writer.write_all(b"\n")?;
            Ok(())
        });

        Self {
            subscriber,
            writer,
            subscription: None,
        }
    }
}

impl ReportHandler for StreamReportHandler {
    fn name(&self) -> &str {
        "raw"
    }

    fn start(&mut self) -> anyhow::Result<()> {
        self.subscription = Some(self.subscriber.subscribe()?);
        Ok(())
    }

    fn finalize(&mut self) -> anyhow::Result<()> {
        if let Some(unsubscribe) = self.subscription.take() {
            unsubscribe.unsubscribe();
        }

        self.writer
            .lock()
            .flush()
            .context("Failed to flush the raw report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::Tracer;
    use lapse_summary_model::TraceRecord;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn one_line_per_trace() {
        let tracer = Tracer::new(8);
        let out = SharedBuffer::default();
        let mut handler = StreamReportHandler::new(tracer.stream(), Box::new(out.clone()));

        handler.start().unwrap();
        tracer.start("a").end(None, None);
        tracer
            .start("b")
            .end(None, Some(Arc::new(anyhow::anyhow!("boom"))));
        handler.finalize().unwrap();

        let written = String::from_utf8(out.0.lock().clone()).unwrap();
        let records = written
            .lines()
            .map(|line| serde_json::from_str::<TraceRecord>(line).unwrap())
            .collect::<Vec<_>>();

        assert_eq!(2, records.len());
        assert_eq!("a", records[0].id);
        assert_eq!(None, records[0].error);
        assert_eq!("b", records[1].id);
        assert_eq!(Some("boom".to_string()), records[1].error);
    }
}
