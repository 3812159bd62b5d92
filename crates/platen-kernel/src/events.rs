//! Event sinks backed by tracing and by an in-memory recorder.

use std::sync::Mutex;

use platen_types::{EventSink, SpoolEvent};

/// Sink that reports every event through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: SpoolEvent) {
        match &event {
            SpoolEvent::CmdError { reason } => {
                tracing::debug!(target: "platen::events", %reason, "cmd_error");
            }
            SpoolEvent::CmdOk => {
                tracing::trace!(target: "platen::events", "cmd_ok");
            }
            other => {
                tracing::info!(target: "platen::events", event = ?other);
            }
        }
    }
}

/// Sink that records events for later inspection. Used by tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SpoolEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events emitted so far, in order.
    pub fn snapshot(&self) -> Vec<SpoolEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Drain and return the recorded events.
    pub fn take(&self) -> Vec<SpoolEvent> {
        std::mem::take(&mut self.events.lock().unwrap())
    }

    /// Count of events matching a predicate.
    pub fn count(&self, pred: impl Fn(&SpoolEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: SpoolEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platen_types::{JobId, JobStatus};

    #[test]
    fn recording_sink_preserves_order() {
        let sink = RecordingSink::new();
        sink.emit(SpoolEvent::CmdOk);
        sink.emit(SpoolEvent::JobStatus { id: JobId(0), status: JobStatus::Created });

        let events = sink.snapshot();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], SpoolEvent::CmdOk);
    }

    #[test]
    fn take_drains_events() {
        let sink = RecordingSink::new();
        sink.emit(SpoolEvent::CmdOk);
        assert_eq!(sink.take().len(), 1);
        assert!(sink.snapshot().is_empty());
    }
}
