//! Command dispatch — the single execution path for every user command.
//!
//! Lines are split on whitespace; blank lines are ignored without comment.
//! Every non-blank command resolves to exactly one `cmd_ok` or `cmd_error`
//! event, and a failing command leaves all spooler state unchanged.

use platen_types::{CmdResult, JobInfo, SpoolError, SpoolEvent};

use crate::kernel::Kernel;

/// The one-line command summary printed by `help`.
pub const COMMAND_LIST: &str =
    "Commands are: help quit type printer conversion printers jobs print cancel disable enable pause resume";

/// Dispatch one line of user input.
pub async fn dispatch_line(kernel: &Kernel, line: &str) -> CmdResult {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&cmd, args)) = tokens.split_first() else {
        // Blank line: no command, no framework signal.
        return CmdResult::success("");
    };

    let result = match cmd {
        "help" => fixed_arity("help", args, 0, |_| CmdResult::success(COMMAND_LIST)),
        "quit" => fixed_arity("quit", args, 0, |_| CmdResult::exit()),
        "type" => declare_type(kernel, args).await,
        "conversion" => declare_conversion(kernel, args).await,
        "printer" => add_printer(kernel, args).await,
        "enable" => enable_printer(kernel, args).await,
        "disable" => CmdResult::failure(1, "disable: not implemented"),
        "printers" => list_printers(kernel).await,
        "print" => print(kernel, args).await,
        "jobs" => list_jobs(kernel).await,
        "cancel" => job_control(kernel, "cancel", args).await,
        "pause" => job_control(kernel, "pause", args).await,
        "resume" => job_control(kernel, "resume", args).await,
        other => CmdResult::failure(1, format!("unrecognized command: {other}")),
    };

    if result.ok() {
        kernel.sink().emit(SpoolEvent::CmdOk);
    } else {
        kernel.sink().emit(SpoolEvent::CmdError { reason: result.err.clone() });
    }
    result
}

fn wrong_args(cmd: &'static str, given: usize, required: usize) -> CmdResult {
    CmdResult::failure(1, SpoolError::WrongArgs { cmd, given, required }.to_string())
}

fn fixed_arity(
    cmd: &'static str,
    args: &[&str],
    required: usize,
    f: impl FnOnce(&[&str]) -> CmdResult,
) -> CmdResult {
    if args.len() != required {
        return wrong_args(cmd, args.len(), required);
    }
    f(args)
}

async fn declare_type(kernel: &Kernel, args: &[&str]) -> CmdResult {
    let [name] = args else {
        return wrong_args("type", args.len(), 1);
    };
    match kernel.declare_type(name).await {
        Ok(()) => CmdResult::success(""),
        Err(e) => CmdResult::failure(1, format!("type: {e}")),
    }
}

async fn declare_conversion(kernel: &Kernel, args: &[&str]) -> CmdResult {
    if args.len() < 3 {
        return wrong_args("conversion", args.len(), 3);
    }
    let (from, to) = (args[0], args[1]);
    let argv: Vec<String> = args[2..].iter().map(|s| s.to_string()).collect();
    match kernel.declare_conversion(from, to, argv).await {
        Ok(()) => CmdResult::success(""),
        Err(e) => CmdResult::failure(1, format!("conversion: {e}")),
    }
}

async fn add_printer(kernel: &Kernel, args: &[&str]) -> CmdResult {
    let [name, type_name] = args else {
        return wrong_args("printer", args.len(), 2);
    };
    match kernel.add_printer(name, type_name).await {
        Ok(info) => CmdResult::success(info.summary()),
        Err(e) => CmdResult::failure(1, format!("printer: {e}")),
    }
}

async fn enable_printer(kernel: &Kernel, args: &[&str]) -> CmdResult {
    let [name] = args else {
        return wrong_args("enable", args.len(), 1);
    };
    match kernel.enable_printer(name).await {
        Ok(info) => CmdResult::success(info.summary()),
        Err(e) => CmdResult::failure(1, format!("enable: {e}")),
    }
}

async fn list_printers(kernel: &Kernel) -> CmdResult {
    let lines: Vec<String> = kernel
        .printer_infos()
        .await
        .iter()
        .map(|info| info.summary())
        .collect();
    CmdResult::success(lines.join("\n"))
}

async fn print(kernel: &Kernel, args: &[&str]) -> CmdResult {
    let (path, printer) = match args {
        [path] => (*path, None),
        [path, printer] => (*path, Some(*printer)),
        _ => return wrong_args("print", args.len(), 1),
    };
    match kernel.submit(path, printer).await {
        Ok(info) => CmdResult::success(job_line(&info)),
        Err(e) => CmdResult::failure(1, format!("print: {e}")),
    }
}

async fn list_jobs(kernel: &Kernel) -> CmdResult {
    let infos = kernel.job_infos().await;
    for info in &infos {
        kernel
            .sink()
            .emit(SpoolEvent::JobStatus { id: info.id, status: info.status });
    }
    let lines: Vec<String> = infos.iter().map(job_line).collect();
    CmdResult::success(lines.join("\n"))
}

async fn job_control(kernel: &Kernel, cmd: &'static str, args: &[&str]) -> CmdResult {
    let [id_str] = args else {
        return wrong_args(cmd, args.len(), 1);
    };
    let Ok(id) = id_str.parse::<usize>() else {
        return CmdResult::failure(1, format!("{cmd}: invalid job id '{id_str}'"));
    };
    let outcome = match cmd {
        "cancel" => kernel.cancel(id).await,
        "pause" => kernel.pause(id).await,
        _ => kernel.resume(id).await,
    };
    match outcome {
        Ok(()) => CmdResult::success(""),
        Err(e) => CmdResult::failure(1, format!("{cmd}: {e}")),
    }
}

fn job_line(info: &JobInfo) -> String {
    let mut line = format!(
        "JOB: id={}, file={}, status={}",
        info.id, info.input_path, info.status
    );
    if let Some(printer) = &info.printer {
        line.push_str(&format!(", printer={printer}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use platen_types::{JobId, JobStatus, PrinterStatus};

    use crate::connect::NullConnector;
    use crate::events::RecordingSink;
    use crate::kernel::SpoolConfig;

    fn kernel_with_sink() -> (Kernel, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let kernel = Kernel::with_parts(
            SpoolConfig::default(),
            sink.clone(),
            Arc::new(NullConnector),
        );
        (kernel, sink)
    }

    #[tokio::test]
    async fn blank_line_emits_nothing() {
        let (kernel, sink) = kernel_with_sink();
        let result = dispatch_line(&kernel, "   ").await;
        assert!(result.ok());
        assert!(sink.snapshot().is_empty());
    }

    #[tokio::test]
    async fn unrecognized_command_fails() {
        let (kernel, sink) = kernel_with_sink();
        let result = dispatch_line(&kernel, "frobnicate").await;
        assert!(!result.ok());
        assert_eq!(sink.count(|e| matches!(e, SpoolEvent::CmdError { .. })), 1);
    }

    #[tokio::test]
    async fn wrong_arity_is_reported() {
        let (kernel, _sink) = kernel_with_sink();
        let result = dispatch_line(&kernel, "type").await;
        assert!(!result.ok());
        assert!(result.err.contains("given: 0, required: 1"));

        let result = dispatch_line(&kernel, "printer onlyname").await;
        assert!(result.err.contains("given: 1, required: 2"));

        let result = dispatch_line(&kernel, "print a b c").await;
        assert!(result.err.contains("given: 3, required: 1"));
    }

    #[tokio::test]
    async fn help_prints_command_list() {
        let (kernel, sink) = kernel_with_sink();
        let result = dispatch_line(&kernel, "help").await;
        assert!(result.ok());
        assert_eq!(result.out, COMMAND_LIST);
        assert_eq!(sink.snapshot(), vec![SpoolEvent::CmdOk]);
    }

    #[tokio::test]
    async fn quit_requests_exit() {
        let (kernel, _sink) = kernel_with_sink();
        let result = dispatch_line(&kernel, "quit").await;
        assert!(result.ok());
        assert!(result.exit);

        let result = dispatch_line(&kernel, "quit now").await;
        assert!(!result.ok());
        assert!(!result.exit);
    }

    #[tokio::test]
    async fn printer_lifecycle_produces_events_and_summary() {
        let (kernel, sink) = kernel_with_sink();
        dispatch_line(&kernel, "type pdf").await;

        let result = dispatch_line(&kernel, "printer alice pdf").await;
        assert!(result.ok());
        assert_eq!(result.out, "PRINTER: id=0, name=alice, type=pdf, status=disabled");

        let result = dispatch_line(&kernel, "enable alice").await;
        assert_eq!(result.out, "PRINTER: id=0, name=alice, type=pdf, status=idle");

        // Enabling again is a no-op: exactly one Idle status event total.
        dispatch_line(&kernel, "enable alice").await;
        let idle_events = sink.count(|e| {
            matches!(e, SpoolEvent::PrinterStatus { status: PrinterStatus::Idle, .. })
        });
        assert_eq!(idle_events, 1);
    }

    #[tokio::test]
    async fn printer_with_unknown_type_is_rejected() {
        let (kernel, _sink) = kernel_with_sink();
        let result = dispatch_line(&kernel, "printer alice pdf").await;
        assert!(!result.ok());
        assert!(result.err.contains("undeclared file type"));
        assert!(kernel.printer_infos().await.is_empty());
    }

    #[tokio::test]
    async fn conversion_requires_declared_types() {
        let (kernel, _sink) = kernel_with_sink();
        dispatch_line(&kernel, "type pdf").await;
        let result = dispatch_line(&kernel, "conversion pdf ps /usr/bin/pdf2ps").await;
        assert!(!result.ok());
        assert!(result.err.contains("undeclared file type: ps"));
    }

    #[tokio::test]
    async fn print_without_printers_stays_created() {
        let (kernel, sink) = kernel_with_sink();
        dispatch_line(&kernel, "type pdf").await;

        let result = dispatch_line(&kernel, "print doc.pdf").await;
        assert!(result.ok());
        assert_eq!(result.out, "JOB: id=0, file=doc.pdf, status=created");

        let events = sink.snapshot();
        assert!(events.contains(&SpoolEvent::JobCreated {
            id: JobId(0),
            path: "doc.pdf".to_string(),
            type_name: "pdf".to_string(),
        }));
        assert!(events.contains(&SpoolEvent::JobStatus {
            id: JobId(0),
            status: JobStatus::Created,
        }));
    }

    #[tokio::test]
    async fn print_with_undeclared_type_fails() {
        let (kernel, _sink) = kernel_with_sink();
        let result = dispatch_line(&kernel, "print doc.xyz").await;
        assert!(!result.ok());
        assert!(result.err.contains("no file type declared"));
        assert!(kernel.job_infos().await.is_empty());
    }

    #[tokio::test]
    async fn cancel_created_job_aborts_it() {
        let (kernel, sink) = kernel_with_sink();
        dispatch_line(&kernel, "type pdf").await;
        dispatch_line(&kernel, "print doc.pdf").await;

        let result = dispatch_line(&kernel, "cancel 0").await;
        assert!(result.ok());
        assert_eq!(kernel.job_infos().await[0].status, JobStatus::Aborted);
        assert!(sink
            .snapshot()
            .contains(&SpoolEvent::JobAborted { id: JobId(0), signal: 0 }));

        // Cancelling a terminal job fails.
        let result = dispatch_line(&kernel, "cancel 0").await;
        assert!(!result.ok());
    }

    #[tokio::test]
    async fn job_control_rejects_bad_ids() {
        let (kernel, _sink) = kernel_with_sink();
        assert!(!dispatch_line(&kernel, "cancel abc").await.ok());
        assert!(!dispatch_line(&kernel, "pause 7").await.ok());
        assert!(!dispatch_line(&kernel, "resume 7").await.ok());
    }

    #[tokio::test]
    async fn jobs_lists_and_reports_status() {
        let (kernel, sink) = kernel_with_sink();
        dispatch_line(&kernel, "type pdf").await;
        dispatch_line(&kernel, "print a.pdf").await;
        dispatch_line(&kernel, "print b.pdf").await;
        sink.take();

        let result = dispatch_line(&kernel, "jobs").await;
        assert!(result.ok());
        assert_eq!(
            result.out,
            "JOB: id=0, file=a.pdf, status=created\nJOB: id=1, file=b.pdf, status=created"
        );
        assert_eq!(
            sink.count(|e| matches!(e, SpoolEvent::JobStatus { .. })),
            2
        );
    }

    #[tokio::test]
    async fn disable_is_not_implemented() {
        let (kernel, _sink) = kernel_with_sink();
        let result = dispatch_line(&kernel, "disable alice").await;
        assert!(!result.ok());
        assert!(result.err.contains("not implemented"));
    }
}
