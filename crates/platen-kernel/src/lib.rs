//! platen-kernel: the core of the platen print spooler.
//!
//! This crate provides:
//!
//! - **Registry**: declared file types and the conversion graph between them
//! - **Printers**: the bounded printer registry and compatibility selection
//! - **Scheduler**: the job spool, dispatch decisions, and sweep expiration
//! - **Pipeline**: fork/exec construction of converter process groups
//! - **Reactor**: SIGCHLD-driven reconciliation of job and printer state
//! - **Dispatch**: the line-oriented command surface
//! - **Seams**: printer connection and event-sink traits for embedders

pub mod connect;
pub mod dispatch;
pub mod events;
pub mod kernel;
pub mod printers;
pub mod registry;
pub mod scheduler;

pub use connect::{NullConnector, PrinterConnector, SpoolDirConnector};
pub use events::{RecordingSink, TracingSink};
pub use kernel::{Kernel, SpoolConfig};
pub use scheduler::reactor::Reactor;

// Re-export the data crate so front ends only need one dependency.
pub use platen_types as types;
