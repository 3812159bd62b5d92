//! CmdResult — the structured result of every user command.

use serde::{Deserialize, Serialize};

/// The result of executing one command line.
///
/// Every command either fully succeeds (`code == 0`) or fails leaving spooler
/// state unchanged. `out` carries human-readable output, `err` the failure
/// reason. `exit` is set only by `quit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmdResult {
    /// Exit code. 0 means success.
    pub code: i64,
    /// Human-readable output.
    pub out: String,
    /// Failure reason, empty on success.
    pub err: String,
    /// True when the command asks the front end to terminate.
    pub exit: bool,
}

impl CmdResult {
    /// Create a successful result with output.
    pub fn success(out: impl Into<String>) -> Self {
        Self { code: 0, out: out.into(), err: String::new(), exit: false }
    }

    /// Create a failed result with an error message.
    pub fn failure(code: i64, err: impl Into<String>) -> Self {
        Self { code, out: String::new(), err: err.into(), exit: false }
    }

    /// Create a successful result that terminates the session.
    pub fn exit() -> Self {
        Self { code: 0, out: String::new(), err: String::new(), exit: true }
    }

    /// True if the command succeeded (exit code 0).
    pub fn ok(&self) -> bool {
        self.code == 0
    }
}

impl Default for CmdResult {
    fn default() -> Self {
        Self::success("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_creates_ok_result() {
        let result = CmdResult::success("done");
        assert!(result.ok());
        assert!(!result.exit);
        assert_eq!(result.out, "done");
    }

    #[test]
    fn failure_creates_non_ok_result() {
        let result = CmdResult::failure(1, "no printer");
        assert!(!result.ok());
        assert_eq!(result.err, "no printer");
    }

    #[test]
    fn exit_is_ok_and_terminating() {
        let result = CmdResult::exit();
        assert!(result.ok());
        assert!(result.exit);
    }
}
