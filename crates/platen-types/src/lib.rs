//! Pure data types for platen — job and printer identities, spooler events,
//! command results, and the error enum.
//!
//! This crate is a leaf dependency with no async runtime and no I/O. It exists
//! so that front ends and test harnesses can observe the spooler's type system
//! without pulling in platen-kernel's process-management machinery.

pub mod error;
pub mod event;
pub mod job;
pub mod printer;
pub mod result;

// Flat re-exports for convenience
pub use error::*;
pub use event::*;
pub use job::*;
pub use printer::*;
pub use result::*;
