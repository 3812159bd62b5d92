//! Spooler error types.

use thiserror::Error;

use crate::job::{JobId, JobStatus};

/// Result type for spooler operations.
pub type SpoolResult<T> = Result<T, SpoolError>;

/// Errors surfaced to the user by spooler operations.
///
/// Every failing command maps to one of these; the command leaves all spooler
/// state unchanged.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SpoolError {
    #[error("wrong number of args (given: {given}, required: {required}) for command '{cmd}'")]
    WrongArgs {
        cmd: &'static str,
        given: usize,
        required: usize,
    },
    #[error("undeclared file type: {0}")]
    UnknownType(String),
    #[error("no file type declared for '{0}'")]
    TypeNotInferable(String),
    #[error("no conversion path from {from} to {to}")]
    NoConversionPath { from: String, to: String },
    #[error("duplicate printer name: {0}")]
    DuplicatePrinter(String),
    #[error("printer table is full")]
    PrinterTableFull,
    #[error("no printer named '{0}'")]
    UnknownPrinter(String),
    #[error("printer '{0}' is not idle")]
    PrinterUnavailable(String),
    #[error("spool is full")]
    SpoolFull,
    #[error("no job with id {0}")]
    UnknownJob(usize),
    #[error("job {id} is {status}")]
    InvalidJobState { id: JobId, status: JobStatus },
    #[error("pipeline launch failed: {0}")]
    Launch(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for SpoolError {
    fn from(err: std::io::Error) -> Self {
        SpoolError::Io(err.to_string())
    }
}
