//! Scheduler module for platen — the job spool, the pipeline engine, and the
//! lifecycle reactor.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Kernel state                          │
//! │  JobStore ◀──── try_schedule ────▶ PrinterRegistry           │
//! │     │                                   │                    │
//! │     │ launch                            │ select_compatible  │
//! │     ▼                                   ▼                    │
//! │  pipeline::spawn ──▶ supervisor process group (pgid)         │
//! │                                                              │
//! │  SIGCHLD ──▶ Reactor ──▶ waitpid drain ──▶ reconcile ──▶     │
//! │                                            try_schedule      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The spool and the registry are mutated only under the kernel's state lock;
//! parallelism comes from the child processes, never from shared memory.

pub mod job;
pub mod pipeline;
pub mod reactor;

pub use job::{Job, JobStore};
pub use reactor::Reactor;
