//! Printer identification and status types.

use serde::{Deserialize, Serialize};

/// Index of a printer in the registry.
///
/// Printers are never removed, so the index is stable for the lifetime of the
/// spooler. Jobs refer to their printer through this handle rather than an
/// owning pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrinterId(pub usize);

impl std::fmt::Display for PrinterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operational status of a printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrinterStatus {
    /// Declared but not yet accepting jobs.
    Disabled,
    /// Accepting jobs.
    Idle,
    /// Servicing a running or paused job.
    Busy,
}

impl std::fmt::Display for PrinterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PrinterStatus::Disabled => "disabled",
            PrinterStatus::Idle => "idle",
            PrinterStatus::Busy => "busy",
        };
        write!(f, "{s}")
    }
}

/// Information about a printer for listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterInfo {
    /// Registry index.
    pub id: PrinterId,
    /// Unique printer name.
    pub name: String,
    /// The single file type this printer accepts.
    pub type_name: String,
    /// Current status.
    pub status: PrinterStatus,
}

impl PrinterInfo {
    /// Render the canonical one-line form used by `printer`, `enable`, and
    /// `printers` output.
    pub fn summary(&self) -> String {
        format!(
            "PRINTER: id={}, name={}, type={}, status={}",
            self.id, self.name, self.type_name, self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_matches_canonical_format() {
        let info = PrinterInfo {
            id: PrinterId(0),
            name: "alice".into(),
            type_name: "pdf".into(),
            status: PrinterStatus::Idle,
        };
        assert_eq!(info.summary(), "PRINTER: id=0, name=alice, type=pdf, status=idle");
    }
}
