//! platen CLI entry point.
//!
//! Usage:
//!   platen                     # Interactive spooler prompt
//!   platen -c <command>        # Execute one command and exit
//!   platen <script>            # Run commands from a file

use std::env;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        None => platen_repl::run_interactive(),

        Some("--help" | "-h") => {
            print_help();
            Ok(ExitCode::SUCCESS)
        }

        Some("--version" | "-V") => {
            println!("platen {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }

        Some("-c") => {
            let cmd = args.get(2).context("-c requires a command argument")?;
            platen_repl::run_command(cmd)
        }

        Some(path) if !path.starts_with('-') => platen_repl::run_script(path),

        Some(unknown) => {
            eprintln!("Unknown option: {unknown}");
            eprintln!("Run 'platen --help' for usage.");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_help() {
    println!(
        r#"platen v{} — print spooler

Usage:
  platen                       Interactive prompt
  platen -c <command>          Execute one command and exit
  platen <script>              Run commands from a file

Options:
  -c <command>                 Execute command string and exit
  -h, --help                   Show this help
  -V, --version                Show version

Commands:
  help                         Show the command list
  quit                         Exit the spooler
  type <name>                  Declare a file type
  conversion <from> <to> <cmd> [args...]
                               Declare a conversion between file types
  printer <name> <type>        Declare a printer (starts disabled)
  enable <printer>             Enable a printer; runs the scheduler
  printers                     List printers
  print <file> [printer]       Submit a print job
  jobs                         List jobs
  cancel <job_id>              Cancel a job
  pause <job_id>               Pause a running job
  resume <job_id>              Resume a paused job
"#,
        env!("CARGO_PKG_VERSION")
    );
}
