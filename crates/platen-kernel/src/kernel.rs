//! The Kernel — the heart of platen.
//!
//! The Kernel owns and coordinates all core components behind one state lock:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Kernel                            │
//! │  ┌──────────────┐  ┌─────────────────┐  ┌─────────────┐  │
//! │  │ TypeRegistry │  │ PrinterRegistry │  │  JobStore   │  │
//! │  │ (conversions)│  │ (bounded, Idle/ │  │ (bounded,   │  │
//! │  │              │  │  Busy tracking) │  │  id = index)│  │
//! │  └──────────────┘  └─────────────────┘  └─────────────┘  │
//! │          one tokio::sync::Mutex over all three           │
//! │                                                          │
//! │  seams: EventSink (observation)  PrinterConnector (fds)  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! All state mutation happens under the lock; the lock is never held across a
//! blocking syscall (`waitpid` runs with `WNOHANG`, `killpg` and `fork` do not
//! block). Parallelism comes from pipeline child processes, not threads.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use tokio::sync::Mutex;

use platen_types::{
    CmdResult, EventSink, JobId, JobInfo, JobStatus, PrinterId, PrinterInfo, PrinterStatus,
    SpoolError, SpoolEvent, SpoolResult,
};

use crate::connect::{PrinterConnector, SpoolDirConnector};
use crate::dispatch;
use crate::events::TracingSink;
use crate::printers::PrinterRegistry;
use crate::registry::TypeRegistry;
use crate::scheduler::job::{Job, JobStore};
use crate::scheduler::pipeline;

/// Configuration for kernel initialization.
#[derive(Debug, Clone)]
pub struct SpoolConfig {
    /// Maximum number of printers that may be declared.
    pub max_printers: usize,
    /// Maximum number of jobs tracked at once.
    pub max_jobs: usize,
    /// How long Finished/Aborted jobs stay visible before the sweep removes
    /// them.
    pub grace: Duration,
    /// Directory the default connector writes printer output into.
    pub spool_dir: PathBuf,
    /// Program used when a job's type already matches its printer.
    pub passthrough: Vec<String>,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            max_printers: 10,
            max_jobs: 64,
            grace: Duration::from_secs(10),
            spool_dir: std::env::temp_dir().join("platen").join("spool"),
            passthrough: vec!["/bin/cat".to_string()],
        }
    }
}

impl SpoolConfig {
    /// Override the expiration grace period.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Override the spool output directory.
    pub fn with_spool_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spool_dir = dir.into();
        self
    }

    /// Override the capacity limits.
    pub fn with_limits(mut self, max_printers: usize, max_jobs: usize) -> Self {
        self.max_printers = max_printers;
        self.max_jobs = max_jobs;
        self
    }
}

/// Borrowed view of the kernel's immutable collaborators, threaded through
/// the state methods so they stay free of `Arc` plumbing.
pub(crate) struct Ctx<'a> {
    pub config: &'a SpoolConfig,
    pub sink: &'a dyn EventSink,
    pub connector: &'a dyn PrinterConnector,
}

/// All mutable spooler state, guarded by one lock.
struct SpoolState {
    registry: TypeRegistry,
    printers: PrinterRegistry,
    jobs: JobStore,
}

/// The Kernel — executes spooler commands and reconciles child events.
pub struct Kernel {
    state: Mutex<SpoolState>,
    config: SpoolConfig,
    sink: Arc<dyn EventSink>,
    connector: Arc<dyn PrinterConnector>,
}

impl Kernel {
    /// Create a kernel with the default connector (spool directory files)
    /// and the tracing event sink.
    pub fn new(config: SpoolConfig) -> Result<Self> {
        let connector = SpoolDirConnector::new(config.spool_dir.clone())
            .with_context(|| format!("create spool dir {}", config.spool_dir.display()))?;
        Ok(Self::with_parts(config, Arc::new(TracingSink), Arc::new(connector)))
    }

    /// Create a kernel with explicit seams. This is how tests observe events
    /// and redirect printer output.
    pub fn with_parts(
        config: SpoolConfig,
        sink: Arc<dyn EventSink>,
        connector: Arc<dyn PrinterConnector>,
    ) -> Self {
        Self {
            state: Mutex::new(SpoolState {
                registry: TypeRegistry::new(),
                printers: PrinterRegistry::new(config.max_printers),
                jobs: JobStore::new(config.max_jobs),
            }),
            config,
            sink,
            connector,
        }
    }

    pub fn config(&self) -> &SpoolConfig {
        &self.config
    }

    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    fn ctx(&self) -> Ctx<'_> {
        Ctx {
            config: &self.config,
            sink: &*self.sink,
            connector: &*self.connector,
        }
    }

    /// Execute one command line: drain pending child events, dispatch the
    /// command, then sweep expired jobs.
    pub async fn execute(&self, line: &str) -> CmdResult {
        self.reap_children().await;
        let result = dispatch::dispatch_line(self, line).await;
        self.sweep().await;
        result
    }

    /// Drain all pending child state changes and reconcile job and printer
    /// state. Returns the number of events handled.
    pub async fn reap_children(&self) -> usize {
        let mut st = self.state.lock().await;
        st.reap(&self.ctx())
    }

    /// Remove expired terminal jobs.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(SystemTime::now()).await
    }

    /// Sweep with an explicit clock, for tests.
    pub async fn sweep_at(&self, now: SystemTime) -> usize {
        let mut st = self.state.lock().await;
        st.jobs.sweep_expired(now, self.config.grace, &*self.sink)
    }

    pub async fn declare_type(&self, name: &str) -> SpoolResult<()> {
        let mut st = self.state.lock().await;
        st.registry.declare_type(name);
        Ok(())
    }

    pub async fn declare_conversion(
        &self,
        from: &str,
        to: &str,
        argv: Vec<String>,
    ) -> SpoolResult<()> {
        let mut st = self.state.lock().await;
        st.registry.declare_conversion(from, to, argv)
    }

    pub async fn add_printer(&self, name: &str, type_name: &str) -> SpoolResult<PrinterInfo> {
        let mut st = self.state.lock().await;
        st.add_printer(name, type_name, &self.ctx())
    }

    pub async fn enable_printer(&self, name: &str) -> SpoolResult<PrinterInfo> {
        let mut st = self.state.lock().await;
        st.enable_printer(name, &self.ctx())
    }

    pub async fn printer_infos(&self) -> Vec<PrinterInfo> {
        self.state.lock().await.printers.infos()
    }

    pub async fn job_infos(&self) -> Vec<JobInfo> {
        let st = self.state.lock().await;
        st.jobs.infos(&st.printers)
    }

    /// Submit a print job. With an explicit printer name the job launches
    /// immediately or the submission fails; otherwise the job is Created and
    /// the scheduler assigns it when a compatible printer is idle.
    pub async fn submit(&self, path: &str, printer: Option<&str>) -> SpoolResult<JobInfo> {
        let mut st = self.state.lock().await;
        let id = st.submit(path, printer, &self.ctx())?;
        st.job_info(id).ok_or(SpoolError::UnknownJob(id.0))
    }

    pub async fn cancel(&self, id: usize) -> SpoolResult<()> {
        let mut st = self.state.lock().await;
        st.cancel(JobId(id), &self.ctx())
    }

    pub async fn pause(&self, id: usize) -> SpoolResult<()> {
        let mut st = self.state.lock().await;
        st.pause(JobId(id))
    }

    pub async fn resume(&self, id: usize) -> SpoolResult<()> {
        let mut st = self.state.lock().await;
        st.resume(JobId(id))
    }
}

impl SpoolState {
    fn job_info(&self, id: JobId) -> Option<JobInfo> {
        let job = self.jobs.get(id)?;
        Some(JobInfo {
            id: job.id,
            input_path: job.input_path.clone(),
            printer: job
                .printer
                .and_then(|p| self.printers.get(p))
                .map(|p| p.name.clone()),
            status: job.status,
        })
    }

    fn add_printer(
        &mut self,
        name: &str,
        type_name: &str,
        ctx: &Ctx<'_>,
    ) -> SpoolResult<PrinterInfo> {
        if !self.registry.contains_type(type_name) {
            return Err(SpoolError::UnknownType(type_name.to_string()));
        }
        let id = self.printers.add(name, type_name)?;
        ctx.sink.emit(SpoolEvent::PrinterDefined {
            name: name.to_string(),
            type_name: type_name.to_string(),
        });
        Ok(PrinterInfo {
            id,
            name: name.to_string(),
            type_name: type_name.to_string(),
            status: PrinterStatus::Disabled,
        })
    }

    fn enable_printer(&mut self, name: &str, ctx: &Ctx<'_>) -> SpoolResult<PrinterInfo> {
        let (id, printer) = self
            .printers
            .find_by_name(name)
            .ok_or_else(|| SpoolError::UnknownPrinter(name.to_string()))?;
        let status = printer.status;

        // Enabling an already-Idle printer is a no-op (no duplicate event);
        // a Busy printer is never downgraded.
        if status == PrinterStatus::Disabled {
            if let Some(p) = self.printers.get_mut(id) {
                p.status = PrinterStatus::Idle;
            }
            ctx.sink.emit(SpoolEvent::PrinterStatus {
                name: name.to_string(),
                status: PrinterStatus::Idle,
            });
            self.try_schedule(ctx);
        }

        let printer = self
            .printers
            .get(id)
            .ok_or_else(|| SpoolError::UnknownPrinter(name.to_string()))?;
        Ok(PrinterInfo {
            id,
            name: printer.name.clone(),
            type_name: printer.type_name.clone(),
            status: printer.status,
        })
    }

    fn submit(&mut self, path: &str, explicit: Option<&str>, ctx: &Ctx<'_>) -> SpoolResult<JobId> {
        if path.is_empty() {
            return Err(SpoolError::TypeNotInferable(path.to_string()));
        }
        if self.jobs.is_full() {
            return Err(SpoolError::SpoolFull);
        }
        let from_type = self
            .registry
            .infer_type(path)
            .ok_or_else(|| SpoolError::TypeNotInferable(path.to_string()))?;

        // An explicit printer must be idle and compatible right now; a printer
        // that could only serve this job via conversion but is busy is a
        // rejection, not a queue.
        let explicit_id = match explicit {
            Some(name) => {
                let (pid, printer) = self
                    .printers
                    .find_by_name(name)
                    .ok_or_else(|| SpoolError::UnknownPrinter(name.to_string()))?;
                if printer.status != PrinterStatus::Idle {
                    return Err(SpoolError::PrinterUnavailable(name.to_string()));
                }
                if printer.type_name != from_type
                    && self.registry.find_path(&from_type, &printer.type_name).is_none()
                {
                    return Err(SpoolError::NoConversionPath {
                        from: from_type.clone(),
                        to: printer.type_name.clone(),
                    });
                }
                Some(pid)
            }
            None => None,
        };

        let id = self.jobs.next_id();
        ctx.sink.emit(SpoolEvent::JobCreated {
            id,
            path: path.to_string(),
            type_name: from_type.clone(),
        });

        let job = Job::new(id, path, SystemTime::now());
        self.jobs.push(job)?;

        match explicit_id {
            None => {
                ctx.sink.emit(SpoolEvent::JobStatus { id, status: JobStatus::Created });
                self.try_schedule(ctx);
                Ok(id)
            }
            Some(pid) => match self.launch(id, pid, &from_type, ctx) {
                Ok(()) => Ok(id),
                Err(e) => {
                    // No printer or job state change survives a failed launch.
                    self.jobs.pop();
                    Err(e)
                }
            },
        }
    }

    /// One scheduling pass: start every Created job that has a compatible
    /// idle printer, in id order.
    fn try_schedule(&mut self, ctx: &Ctx<'_>) {
        for i in 0..self.jobs.len() {
            let id = JobId(i);
            let (status, input_path) = match self.jobs.get(id) {
                Some(job) => (job.status, job.input_path.clone()),
                None => continue,
            };
            if status != JobStatus::Created {
                continue;
            }
            let Some(from_type) = self.registry.infer_type(&input_path) else {
                continue;
            };
            let Some(pid) = self.printers.select_compatible(&from_type, &self.registry) else {
                continue;
            };
            if let Err(e) = self.launch(id, pid, &from_type, ctx) {
                tracing::warn!(job = i, error = %e, "pipeline launch failed; job stays created");
            }
        }
    }

    /// Resolve the conversion path, connect the printer, and fork the
    /// pipeline. Mutates job and printer state only after the pipeline is
    /// running; on error, state is untouched.
    fn launch(
        &mut self,
        id: JobId,
        printer_id: PrinterId,
        from_type: &str,
        ctx: &Ctx<'_>,
    ) -> SpoolResult<()> {
        let printer = self
            .printers
            .get(printer_id)
            .ok_or(SpoolError::UnknownJob(id.0))?;
        let printer_name = printer.name.clone();
        let printer_type = printer.type_name.clone();

        let path = if from_type == printer_type {
            Vec::new()
        } else {
            self.registry
                .find_path(from_type, &printer_type)
                .ok_or_else(|| SpoolError::NoConversionPath {
                    from: from_type.to_string(),
                    to: printer_type.clone(),
                })?
        };

        let (stages, stage_names) = if path.is_empty() {
            let name = Path::new(&ctx.config.passthrough[0])
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| ctx.config.passthrough[0].clone());
            (vec![ctx.config.passthrough.clone()], vec![name])
        } else {
            (
                path.iter().map(|c| c.argv.clone()).collect(),
                path.iter().map(|c| c.argv[0].clone()).collect(),
            )
        };

        let input_path = self
            .jobs
            .get(id)
            .ok_or(SpoolError::UnknownJob(id.0))?
            .input_path
            .clone();

        let fd = ctx
            .connector
            .connect(&printer_name, &printer_type)
            .map_err(|e| SpoolError::Launch(format!("connect to printer '{printer_name}': {e}")))?;
        let pgid = pipeline::spawn(&input_path, &stages, fd)?;

        let now = SystemTime::now();
        if let Some(job) = self.jobs.get_mut(id) {
            job.printer = Some(printer_id);
            job.pgid = Some(pgid);
            job.set_status(JobStatus::Running, now);
        }
        if let Some(p) = self.printers.get_mut(printer_id) {
            p.status = PrinterStatus::Busy;
        }

        ctx.sink.emit(SpoolEvent::JobStatus { id, status: JobStatus::Running });
        ctx.sink.emit(SpoolEvent::PrinterStatus {
            name: printer_name.clone(),
            status: PrinterStatus::Busy,
        });
        ctx.sink.emit(SpoolEvent::JobStarted {
            id,
            printer: printer_name,
            pgid: pgid.as_raw(),
            stages: stage_names,
        });
        tracing::debug!(job = id.0, pgid = pgid.as_raw(), "pipeline started");
        Ok(())
    }

    fn cancel(&mut self, id: JobId, ctx: &Ctx<'_>) -> SpoolResult<()> {
        let job = self.jobs.get(id).ok_or(SpoolError::UnknownJob(id.0))?;
        match job.status {
            JobStatus::Created => {
                if let Some(job) = self.jobs.get_mut(id) {
                    job.set_status(JobStatus::Aborted, SystemTime::now());
                }
                ctx.sink.emit(SpoolEvent::JobStatus { id, status: JobStatus::Aborted });
                ctx.sink.emit(SpoolEvent::JobAborted { id, signal: 0 });
                Ok(())
            }
            JobStatus::Running | JobStatus::Paused => {
                let paused = job.status == JobStatus::Paused;
                let pgid = job
                    .pgid
                    .ok_or_else(|| SpoolError::Io("job has no process group".to_string()))?;
                // Best-effort, synchronous at the signaling level. The job is
                // reported Aborted now; the supervisor's eventual exit is
                // reaped as a no-op because the pgid is cleared here.
                pipeline::terminate_group(pgid, paused);

                let printer_id = job.printer;
                if let Some(job) = self.jobs.get_mut(id) {
                    job.set_status(JobStatus::Aborted, SystemTime::now());
                    job.pgid = None;
                }
                ctx.sink.emit(SpoolEvent::JobStatus { id, status: JobStatus::Aborted });
                self.release_printer(printer_id, ctx);
                ctx.sink.emit(SpoolEvent::JobAborted { id, signal: 0 });
                // The freed printer may admit a waiting job.
                self.try_schedule(ctx);
                Ok(())
            }
            status => Err(SpoolError::InvalidJobState { id, status }),
        }
    }

    /// Pause only signals the group; the status changes when the reactor
    /// observes the stop.
    fn pause(&mut self, id: JobId) -> SpoolResult<()> {
        let job = self.jobs.get(id).ok_or(SpoolError::UnknownJob(id.0))?;
        if job.status != JobStatus::Running {
            return Err(SpoolError::InvalidJobState { id, status: job.status });
        }
        let pgid = job
            .pgid
            .ok_or_else(|| SpoolError::Io("job has no process group".to_string()))?;
        pipeline::pause_group(pgid)
    }

    /// Resume only signals the group; the status changes when the reactor
    /// observes the continue.
    fn resume(&mut self, id: JobId) -> SpoolResult<()> {
        let job = self.jobs.get(id).ok_or(SpoolError::UnknownJob(id.0))?;
        if job.status != JobStatus::Paused {
            return Err(SpoolError::InvalidJobState { id, status: job.status });
        }
        let pgid = job
            .pgid
            .ok_or_else(|| SpoolError::Io("job has no process group".to_string()))?;
        pipeline::resume_group(pgid)
    }

    /// Drain all pending child state changes without blocking and apply the
    /// transition table. Events are processed in the order the OS reports
    /// them; after the drain, freed printers are offered to waiting jobs.
    fn reap(&mut self, ctx: &Ctx<'_>) -> usize {
        let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
        let mut handled = 0;
        loop {
            match waitpid(Pid::from_raw(-1), Some(flags)) {
                Ok(WaitStatus::StillAlive) => break,
                Ok(WaitStatus::Stopped(pid, _)) => {
                    self.on_stopped(pid, ctx);
                    handled += 1;
                }
                Ok(WaitStatus::Continued(pid)) => {
                    self.on_continued(pid, ctx);
                    handled += 1;
                }
                Ok(WaitStatus::Exited(pid, code)) => {
                    self.on_exited(pid, code, ctx);
                    handled += 1;
                }
                Ok(WaitStatus::Signaled(pid, sig, _)) => {
                    self.on_signaled(pid, sig as i32, ctx);
                    handled += 1;
                }
                Ok(other) => {
                    tracing::debug!(?other, "unhandled wait status");
                }
                Err(Errno::ECHILD) => break,
                Err(Errno::EINTR) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "waitpid failed");
                    break;
                }
            }
        }
        if handled > 0 {
            self.try_schedule(ctx);
        }
        handled
    }

    fn on_stopped(&mut self, pid: Pid, ctx: &Ctx<'_>) {
        let Some(id) = self.jobs.find_by_pgid(pid) else {
            tracing::debug!(pid = pid.as_raw(), "stop report for unknown group");
            return;
        };
        let Some(job) = self.jobs.get_mut(id) else { return };
        if job.status != JobStatus::Running {
            return;
        }
        job.set_status(JobStatus::Paused, SystemTime::now());
        ctx.sink.emit(SpoolEvent::JobStatus { id, status: JobStatus::Paused });
    }

    fn on_continued(&mut self, pid: Pid, ctx: &Ctx<'_>) {
        let Some(id) = self.jobs.find_by_pgid(pid) else {
            tracing::debug!(pid = pid.as_raw(), "continue report for unknown group");
            return;
        };
        let Some(job) = self.jobs.get_mut(id) else { return };
        if job.status != JobStatus::Paused {
            return;
        }
        job.set_status(JobStatus::Running, SystemTime::now());
        ctx.sink.emit(SpoolEvent::JobStatus { id, status: JobStatus::Running });
    }

    fn on_exited(&mut self, pid: Pid, code: i32, ctx: &Ctx<'_>) {
        // A supervisor whose job was already cancelled has no live pgid entry;
        // reaping it is the whole job here.
        let Some(id) = self.jobs.find_by_pgid(pid) else {
            tracing::debug!(pid = pid.as_raw(), code, "reaped supervisor with no live job");
            return;
        };
        let printer_id = self.jobs.get(id).and_then(|j| j.printer);
        if let Some(job) = self.jobs.get_mut(id) {
            job.set_status(JobStatus::Finished, SystemTime::now());
            job.pgid = None;
        }
        ctx.sink.emit(SpoolEvent::JobStatus { id, status: JobStatus::Finished });
        ctx.sink.emit(SpoolEvent::JobFinished { id, code });
        self.release_printer(printer_id, ctx);
    }

    fn on_signaled(&mut self, pid: Pid, signal: i32, ctx: &Ctx<'_>) {
        let Some(id) = self.jobs.find_by_pgid(pid) else {
            tracing::debug!(pid = pid.as_raw(), signal, "reaped signaled supervisor with no live job");
            return;
        };
        let printer_id = self.jobs.get(id).and_then(|j| j.printer);
        if let Some(job) = self.jobs.get_mut(id) {
            job.set_status(JobStatus::Aborted, SystemTime::now());
            job.pgid = None;
        }
        ctx.sink.emit(SpoolEvent::JobStatus { id, status: JobStatus::Aborted });
        ctx.sink.emit(SpoolEvent::JobAborted { id, signal });
        self.release_printer(printer_id, ctx);
    }

    fn release_printer(&mut self, printer_id: Option<PrinterId>, ctx: &Ctx<'_>) {
        let Some(pid) = printer_id else { return };
        let Some(printer) = self.printers.get_mut(pid) else { return };
        if printer.status != PrinterStatus::Busy {
            return;
        }
        printer.status = PrinterStatus::Idle;
        ctx.sink.emit(SpoolEvent::PrinterStatus {
            name: printer.name.clone(),
            status: PrinterStatus::Idle,
        });
    }
}
