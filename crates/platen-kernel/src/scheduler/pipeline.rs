//! Pipeline construction and process-group control.
//!
//! A job's pipeline is a supervisor process plus one child per stage:
//!
//! ```text
//!   spooler ──fork──▶ supervisor (setpgid(0,0) — group leader, pgid == pid)
//!                        │ fork per stage, each setpgid(0, pgid)
//!                        ▼
//!   input file ─▶ [stage 0] ─pipe─▶ [stage 1] ─pipe─▶ … ─▶ [stage N-1] ─▶ printer fd
//! ```
//!
//! The spooler controls the whole pipeline by signalling the supervisor's
//! process group: SIGSTOP pauses every stage, SIGCONT resumes, and a cancel
//! sends SIGCONT first (so stopped stages can see it) then SIGTERM. The
//! supervisor reaps its stages and exits 0 only if every stage exited 0.
//!
//! Descriptor discipline: the printer descriptor is opened by the spooler
//! before the first fork and closed by every process that does not need it —
//! the spooler right after forking the supervisor, the supervisor after
//! forking the stages, and every non-final stage before exec. Intermediate
//! pipe ends are closed as soon as they are handed off. At steady state the
//! input file is open only in stage 0 and the printer descriptor only in the
//! last stage.
//!
//! Everything that allocates (argv `CString`s, the input path) is prepared
//! before the first fork; forked children make only async-signal-safe calls
//! and leave via `_exit`.

use std::ffi::CString;
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd, RawFd};

use nix::errno::Errno;
use nix::fcntl::{OFlag, open};
use nix::libc;
use nix::sys::signal::{Signal, killpg};
use nix::sys::stat::Mode;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, close, dup2, execvp, fork, getpid, pipe, setpgid};

use platen_types::{SpoolError, SpoolResult};

/// Launch a pipeline for `input_path` through `stages`, delivering the final
/// bytes to `printer_fd`.
///
/// Each element of `stages` is the argv of one converter stage; callers pass
/// a single passthrough stage when no conversion is needed. Returns the
/// supervisor pid, which is also the process group id used for all later
/// control signals. On return the spooler no longer holds `printer_fd`.
pub fn spawn(
    input_path: &str,
    stages: &[Vec<String>],
    printer_fd: OwnedFd,
) -> SpoolResult<Pid> {
    if stages.is_empty() || stages.iter().any(|argv| argv.is_empty()) {
        return Err(SpoolError::Launch("pipeline has an empty stage".to_string()));
    }

    // Everything the children will need, allocated before the first fork.
    let input = CString::new(input_path)
        .map_err(|_| SpoolError::Launch("input path contains NUL".to_string()))?;
    let argvs: Vec<Vec<CString>> = stages
        .iter()
        .map(|argv| {
            argv.iter()
                .map(|a| CString::new(a.as_str()))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| SpoolError::Launch("stage argument contains NUL".to_string()))?;

    let printer_raw = printer_fd.as_raw_fd();

    match unsafe { fork() } {
        Err(e) => Err(SpoolError::Launch(format!("fork: {e}"))),
        Ok(ForkResult::Parent { child }) => {
            // The supervisor inherited the printer descriptor; the spooler
            // must not keep it.
            drop(printer_fd);
            // Mirror the child's setpgid so signals sent immediately after
            // spawn target the right group even if the child has not run yet.
            let _ = setpgid(child, child);
            Ok(child)
        }
        Ok(ForkResult::Child) => run_supervisor(&input, &argvs, printer_raw),
    }
}

/// Send SIGSTOP to a pipeline's process group.
pub fn pause_group(pgid: Pid) -> SpoolResult<()> {
    killpg(pgid, Signal::SIGSTOP).map_err(|e| SpoolError::Io(format!("killpg: {e}")))
}

/// Send SIGCONT to a pipeline's process group.
pub fn resume_group(pgid: Pid) -> SpoolResult<()> {
    killpg(pgid, Signal::SIGCONT).map_err(|e| SpoolError::Io(format!("killpg: {e}")))
}

/// Terminate a pipeline's process group. A paused group is continued first so
/// the stages are runnable when SIGTERM arrives. Errors are ignored: the
/// group may already be gone, and the reactor handles the exit either way.
pub fn terminate_group(pgid: Pid, paused: bool) {
    if paused {
        let _ = killpg(pgid, Signal::SIGCONT);
    }
    let _ = killpg(pgid, Signal::SIGTERM);
}

/// Supervisor body. Runs post-fork: syscalls only, exit via `_exit`.
fn run_supervisor(input: &CString, argvs: &[Vec<CString>], printer_raw: RawFd) -> ! {
    // Become the leader of a fresh process group; pgid == our pid.
    if setpgid(Pid::from_raw(0), Pid::from_raw(0)).is_err() {
        unsafe { libc::_exit(1) };
    }
    let pgid = getpid();

    let last = argvs.len() - 1;
    let mut prev_read: RawFd = -1;

    for (i, argv) in argvs.iter().enumerate() {
        let is_last = i == last;

        // Pipe feeding the next stage, if there is one.
        let (pipe_read, pipe_write): (RawFd, RawFd) = if is_last {
            (-1, -1)
        } else {
            match pipe() {
                Ok((r, w)) => (r.into_raw_fd(), w.into_raw_fd()),
                Err(_) => unsafe { libc::_exit(1) },
            }
        };

        match unsafe { fork() } {
            Err(_) => unsafe { libc::_exit(1) },
            Ok(ForkResult::Child) => run_stage(StageIo {
                first: i == 0,
                last: is_last,
                input,
                argv,
                prev_read,
                pipe_read,
                pipe_write,
                printer_raw,
                pgid,
            }),
            Ok(ForkResult::Parent { child }) => {
                // Both sides call setpgid so the stage is in the group before
                // any group signal can race the exec.
                let _ = setpgid(child, pgid);
                if prev_read >= 0 {
                    let _ = close(prev_read);
                }
                if !is_last {
                    prev_read = pipe_read;
                    let _ = close(pipe_write);
                }
            }
        }
    }

    // All stages hold their ends now; the supervisor needs none of them.
    let _ = close(printer_raw);

    // Reap every stage; exit 0 only if all of them exited 0.
    let mut failed = false;
    loop {
        match waitpid(Pid::from_raw(-1), None) {
            Ok(WaitStatus::Exited(_, 0)) => {}
            Ok(WaitStatus::Exited(_, _)) | Ok(WaitStatus::Signaled(..)) => failed = true,
            Ok(_) => {}
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => break,
            Err(_) => {
                failed = true;
                break;
            }
        }
    }

    unsafe { libc::_exit(if failed { 1 } else { 0 }) }
}

struct StageIo<'a> {
    first: bool,
    last: bool,
    input: &'a CString,
    argv: &'a [CString],
    prev_read: RawFd,
    pipe_read: RawFd,
    pipe_write: RawFd,
    printer_raw: RawFd,
    pgid: Pid,
}

/// Stage body. Wires stdin/stdout, drops every descriptor it does not own,
/// and execs the stage program. Runs post-fork: syscalls only.
fn run_stage(io: StageIo<'_>) -> ! {
    let _ = setpgid(Pid::from_raw(0), io.pgid);

    // stdin: the input file for stage 0, the previous pipe otherwise.
    if io.first {
        let fd = match open(io.input.as_c_str(), OFlag::O_RDONLY, Mode::empty()) {
            Ok(fd) => fd,
            Err(_) => unsafe { libc::_exit(1) },
        };
        if dup2(fd, libc::STDIN_FILENO).is_err() {
            unsafe { libc::_exit(1) };
        }
        let _ = close(fd);
    } else {
        if io.prev_read < 0 || dup2(io.prev_read, libc::STDIN_FILENO).is_err() {
            unsafe { libc::_exit(1) };
        }
        let _ = close(io.prev_read);
    }

    // stdout: the next pipe, or the printer descriptor for the last stage.
    if io.last {
        if dup2(io.printer_raw, libc::STDOUT_FILENO).is_err() {
            unsafe { libc::_exit(1) };
        }
        let _ = close(io.printer_raw);
    } else {
        let _ = close(io.pipe_read);
        if dup2(io.pipe_write, libc::STDOUT_FILENO).is_err() {
            unsafe { libc::_exit(1) };
        }
        let _ = close(io.pipe_write);
        // The printer descriptor belongs to the last stage only.
        let _ = close(io.printer_raw);
    }

    let _ = execvp(io.argv[0].as_c_str(), io.argv);
    unsafe { libc::_exit(127) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect::PrinterConnector;

    #[test]
    fn empty_stage_list_is_rejected() {
        let fd = crate::connect::NullConnector
            .connect("p", "t")
            .expect("open /dev/null");
        let err = spawn("in.pdf", &[], fd).unwrap_err();
        assert!(matches!(err, SpoolError::Launch(_)));
    }

    #[test]
    fn nul_in_argument_is_rejected() {
        let fd = crate::connect::NullConnector
            .connect("p", "t")
            .expect("open /dev/null");
        let stages = vec![vec!["bad\0arg".to_string()]];
        let err = spawn("in.pdf", &stages, fd).unwrap_err();
        assert!(matches!(err, SpoolError::Launch(_)));
    }
}
