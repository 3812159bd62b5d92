//! Spooler lifecycle events and the sink they are reported through.
//!
//! Every externally observable transition in the spooler is mirrored by one
//! `SpoolEvent`. Sinks are how tests observe the core without scraping the
//! terminal; the kernel calls them at exactly the transitions the state model
//! prescribes.

use serde::{Deserialize, Serialize};

use crate::job::{JobId, JobStatus};
use crate::printer::PrinterStatus;

/// An observable spooler transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpoolEvent {
    /// A printer was declared (status Disabled).
    PrinterDefined { name: String, type_name: String },
    /// A printer changed status.
    PrinterStatus { name: String, status: PrinterStatus },
    /// A job was accepted into the spool.
    JobCreated { id: JobId, path: String, type_name: String },
    /// A job changed status.
    JobStatus { id: JobId, status: JobStatus },
    /// A job's pipeline was launched.
    JobStarted {
        id: JobId,
        printer: String,
        pgid: i32,
        /// Program name of each pipeline stage, in order.
        stages: Vec<String>,
    },
    /// A job's pipeline exited; `code` is the supervisor exit code.
    JobFinished { id: JobId, code: i32 },
    /// A job was aborted; `signal` is the terminating signal, or 0 when the
    /// abort came from `cancel` rather than the OS.
    JobAborted { id: JobId, signal: i32 },
    /// An expired job was removed from the spool.
    JobDeleted { id: JobId },
    /// A user command completed successfully.
    CmdOk,
    /// A user command failed; state is unchanged.
    CmdError { reason: String },
}

impl SpoolEvent {
    /// Serialize for structured logging or test golden files.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Receiver for spooler events.
///
/// Implementations must not block: sinks are called while the spooler state
/// lock is held.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SpoolEvent);
}

/// Sink that discards every event.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: SpoolEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_to_tagged_json() {
        let event = SpoolEvent::JobFinished { id: JobId(3), code: 0 };
        let json = event.to_json();
        assert!(json.get("JobFinished").is_some());
    }
}
