//! The job spool: bounded storage for print jobs.
//!
//! Job ids equal the job's index in the spool. Terminal jobs linger for a
//! grace period so users can inspect their final state, then the sweep
//! removes them, compacts the spool, and renumbers the survivors so the
//! id-equals-index invariant holds again.

use std::time::{Duration, SystemTime};

use nix::unistd::Pid;

use platen_types::{
    EventSink, JobId, JobInfo, JobStatus, PrinterId, SpoolError, SpoolEvent, SpoolResult,
};

use crate::printers::PrinterRegistry;

/// A single print job.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub input_path: String,
    /// Assigned printer, if the job has ever been scheduled.
    pub printer: Option<PrinterId>,
    pub status: JobStatus,
    /// Supervisor process-group id. Set iff the job is Running or Paused.
    pub pgid: Option<Pid>,
    pub created_at: SystemTime,
    pub status_changed_at: SystemTime,
}

impl Job {
    pub fn new(id: JobId, input_path: impl Into<String>, now: SystemTime) -> Self {
        Self {
            id,
            input_path: input_path.into(),
            printer: None,
            status: JobStatus::Created,
            pgid: None,
            created_at: now,
            status_changed_at: now,
        }
    }

    /// Transition to `status`, stamping the change time.
    pub fn set_status(&mut self, status: JobStatus, now: SystemTime) {
        self.status = status;
        self.status_changed_at = now;
    }
}

/// Bounded collection of jobs, indexed by id.
#[derive(Debug)]
pub struct JobStore {
    jobs: Vec<Job>,
    capacity: usize,
}

impl JobStore {
    pub fn new(capacity: usize) -> Self {
        Self { jobs: Vec::new(), capacity }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.jobs.len() >= self.capacity
    }

    /// The id the next accepted job will get.
    pub fn next_id(&self) -> JobId {
        JobId(self.jobs.len())
    }

    pub fn push(&mut self, job: Job) -> SpoolResult<JobId> {
        if self.is_full() {
            return Err(SpoolError::SpoolFull);
        }
        let id = job.id;
        self.jobs.push(job);
        Ok(id)
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(id.0)
    }

    /// Remove and return the most recently pushed job. Used to roll back a
    /// submission whose launch failed.
    pub fn pop(&mut self) -> Option<Job> {
        self.jobs.pop()
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    /// Locate the job whose supervisor pgid equals `pid`.
    ///
    /// Only Running/Paused jobs carry a pgid, so at most one job matches.
    pub fn find_by_pgid(&self, pid: Pid) -> Option<JobId> {
        self.jobs.iter().find(|j| j.pgid == Some(pid)).map(|j| j.id)
    }

    pub fn infos(&self, printers: &PrinterRegistry) -> Vec<JobInfo> {
        self.jobs
            .iter()
            .map(|j| JobInfo {
                id: j.id,
                input_path: j.input_path.clone(),
                printer: j
                    .printer
                    .and_then(|p| printers.get(p))
                    .map(|p| p.name.clone()),
                status: j.status,
            })
            .collect()
    }

    /// Remove terminal jobs whose status age has reached `grace`, emitting
    /// `job_deleted` for each. Survivors are renumbered so ids equal indices
    /// again. Returns the number of jobs removed.
    pub fn sweep_expired(
        &mut self,
        now: SystemTime,
        grace: Duration,
        sink: &dyn EventSink,
    ) -> usize {
        let expired = |j: &Job| {
            j.status.is_terminal()
                && now
                    .duration_since(j.status_changed_at)
                    .map(|age| age >= grace)
                    .unwrap_or(false)
        };

        let before = self.jobs.len();
        self.jobs.retain(|j| {
            if expired(j) {
                sink.emit(SpoolEvent::JobDeleted { id: j.id });
                false
            } else {
                true
            }
        });
        let removed = before - self.jobs.len();

        if removed > 0 {
            for (i, job) in self.jobs.iter_mut().enumerate() {
                job.id = JobId(i);
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platen_types::NullSink;

    fn store_with(count: usize) -> JobStore {
        let now = SystemTime::now();
        let mut store = JobStore::new(8);
        for i in 0..count {
            store.push(Job::new(JobId(i), format!("f{i}.pdf"), now)).unwrap();
        }
        store
    }

    #[test]
    fn push_rejects_when_full() {
        let now = SystemTime::now();
        let mut store = JobStore::new(1);
        store.push(Job::new(JobId(0), "a.pdf", now)).unwrap();
        let err = store.push(Job::new(JobId(1), "b.pdf", now)).unwrap_err();
        assert_eq!(err, SpoolError::SpoolFull);
    }

    #[test]
    fn find_by_pgid_matches_active_job() {
        let mut store = store_with(2);
        store.get_mut(JobId(1)).unwrap().pgid = Some(Pid::from_raw(4242));
        assert_eq!(store.find_by_pgid(Pid::from_raw(4242)), Some(JobId(1)));
        assert_eq!(store.find_by_pgid(Pid::from_raw(1)), None);
    }

    #[test]
    fn sweep_ignores_fresh_terminal_jobs() {
        let mut store = store_with(1);
        let now = SystemTime::now();
        store.get_mut(JobId(0)).unwrap().set_status(JobStatus::Finished, now);
        assert_eq!(store.sweep_expired(now, Duration::from_secs(10), &NullSink), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sweep_renumbers_surviving_jobs() {
        let mut store = store_with(3);
        let now = SystemTime::now();
        let old = now - Duration::from_secs(20);

        // Job 0 expired, job 1 still running, job 2 recently finished.
        store.get_mut(JobId(0)).unwrap().set_status(JobStatus::Finished, old);
        store.get_mut(JobId(1)).unwrap().status = JobStatus::Running;
        store.get_mut(JobId(2)).unwrap().set_status(JobStatus::Aborted, now);

        let removed = store.sweep_expired(now, Duration::from_secs(10), &NullSink);
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 2);

        // Survivors renumbered to their new index; next id reuses the slot.
        assert_eq!(store.get(JobId(0)).unwrap().input_path, "f1.pdf");
        assert_eq!(store.get(JobId(1)).unwrap().input_path, "f2.pdf");
        assert_eq!(store.next_id(), JobId(2));
    }
}
