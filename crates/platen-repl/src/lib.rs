//! platen REPL — interactive front end for the print spooler.
//!
//! Three entry modes, mirroring the binary's CLI:
//! - interactive: rustyline prompt with persistent history
//! - command: `-c <line>` executes one command and exits
//! - script: a file of commands, one per line
//!
//! Every mode drives the same kernel; the lifecycle reactor runs on the tokio
//! runtime in the background, so job and printer state stay current even
//! while the prompt blocks waiting for input.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use tokio::runtime::Runtime;

use platen_kernel::{Kernel, Reactor, SpoolConfig};
use platen_types::CmdResult;

/// A kernel plus the runtime its reactor lives on.
pub struct Session {
    kernel: Arc<Kernel>,
    runtime: Runtime,
}

impl Session {
    /// Build the kernel and install the child-signal reactor.
    ///
    /// Failure to install the SIGCHLD hook is fatal: without it, job and
    /// printer state could never be reconciled.
    pub fn new(config: SpoolConfig) -> Result<Self> {
        let runtime = Runtime::new().context("failed to create tokio runtime")?;
        let kernel = Arc::new(Kernel::new(config).context("failed to initialize spooler")?);

        let reactor = runtime.block_on(async { Reactor::install() })?;
        runtime.spawn(reactor.run(kernel.clone()));

        Ok(Self { kernel, runtime })
    }

    /// Execute one command line.
    pub fn execute(&self, line: &str) -> CmdResult {
        self.runtime.block_on(self.kernel.execute(line))
    }
}

/// Print a command result the way the terminal expects it.
fn report(result: &CmdResult) {
    if !result.out.is_empty() {
        println!("{}", result.out);
    }
    if !result.err.is_empty() {
        eprintln!("error: {}", result.err);
    }
}

/// Run the interactive REPL. Returns when the user quits or closes stdin.
pub fn run_interactive() -> Result<ExitCode> {
    println!("platen v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'help' for commands, 'quit' to exit.");
    println!();

    let session = Session::new(SpoolConfig::default())?;

    let mut rl: Editor<(), DefaultHistory> =
        Editor::new().context("failed to create line editor")?;

    let history_path = directories::BaseDirs::new()
        .map(|b| b.data_dir().join("platen").join("history.txt"));
    if let Some(path) = &history_path {
        if let Err(e) = rl.load_history(path) {
            let not_found = matches!(&e, ReadlineError::Io(io_err)
                if io_err.kind() == std::io::ErrorKind::NotFound);
            if !not_found {
                tracing::warn!("failed to load history: {}", e);
            }
        }
    }

    loop {
        match rl.readline("platen> ") {
            Ok(line) => {
                if let Err(e) = rl.add_history_entry(line.as_str()) {
                    tracing::warn!("failed to add history entry: {}", e);
                }
                let result = session.execute(&line);
                report(&result);
                if result.exit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("error: {err}");
                break;
            }
        }
    }

    save_history(&mut rl, &history_path);
    Ok(ExitCode::SUCCESS)
}

/// Execute a single command line and exit.
pub fn run_command(cmd: &str) -> Result<ExitCode> {
    let session = Session::new(SpoolConfig::default())?;
    let result = session.execute(cmd);
    report(&result);
    Ok(if result.ok() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Run a script of commands, one per line. EOF exits with code 0.
pub fn run_script(path: &str) -> Result<ExitCode> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script: {path}"))?;

    let session = Session::new(SpoolConfig::default())?;
    for line in source.lines() {
        let result = session.execute(line);
        report(&result);
        if result.exit {
            break;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn save_history(rl: &mut Editor<(), DefaultHistory>, history_path: &Option<PathBuf>) {
    if let Some(path) = history_path {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("failed to create history directory: {}", e);
            }
        }
        if let Err(e) = rl.save_history(path) {
            tracing::warn!("failed to save history: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_executes_commands() {
        let session = Session::new(SpoolConfig::default()).expect("create session");

        let result = session.execute("help");
        assert!(result.ok());
        assert!(result.out.contains("Commands are:"));

        assert!(session.execute("type pdf").ok());
        assert!(!session.execute("bogus").ok());

        let result = session.execute("quit");
        assert!(result.ok());
        assert!(result.exit);
    }
}
