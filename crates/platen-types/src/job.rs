//! Job identification and status types.

use serde::{Deserialize, Serialize};

/// Unique identifier for a print job.
///
/// Ids equal the job's index in the spool at submission time. When expired
/// jobs are swept, surviving jobs are renumbered to their new index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub usize);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Accepted but not yet assigned to a printer.
    Created,
    /// Pipeline is running.
    Running,
    /// Pipeline stopped by SIGSTOP; resumable.
    Paused,
    /// Pipeline exited; exit code reported via `job_finished`.
    Finished,
    /// Cancelled, or pipeline killed by a signal.
    Aborted,
    /// Expired and removed from the spool.
    Deleted,
}

impl JobStatus {
    /// True for states in which the job owns a live process group.
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Running | JobStatus::Paused)
    }

    /// True for states eligible for expiration sweeping.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Aborted)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Created => "created",
            JobStatus::Running => "running",
            JobStatus::Paused => "paused",
            JobStatus::Finished => "finished",
            JobStatus::Aborted => "aborted",
            JobStatus::Deleted => "deleted",
        };
        write!(f, "{s}")
    }
}

/// Information about a job for listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    /// Job ID.
    pub id: JobId,
    /// Path of the file being printed.
    pub input_path: String,
    /// Name of the assigned printer, if any.
    pub printer: Option<String>,
    /// Current status.
    pub status: JobStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_is_lowercase() {
        assert_eq!(JobStatus::Created.to_string(), "created");
        assert_eq!(JobStatus::Aborted.to_string(), "aborted");
    }

    #[test]
    fn active_and_terminal_partition() {
        assert!(JobStatus::Running.is_active());
        assert!(JobStatus::Paused.is_active());
        assert!(!JobStatus::Finished.is_active());
        assert!(JobStatus::Finished.is_terminal());
        assert!(JobStatus::Aborted.is_terminal());
        assert!(!JobStatus::Created.is_terminal());
        assert!(!JobStatus::Deleted.is_terminal());
    }
}
