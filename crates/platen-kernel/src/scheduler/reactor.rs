//! The lifecycle reactor: bridges SIGCHLD to state reconciliation.
//!
//! The OS handler behind `tokio::signal::unix::signal` does nothing beyond
//! flagging the stream — the async-signal-safe contract — and all waiting and
//! bookkeeping happens here on an ordinary task. One signal edge may cover
//! any number of child state changes, so every wakeup drains `waitpid` until
//! it reports nothing; the kernel additionally drains at the start of every
//! command, so no event is deferred past one interaction even if the process
//! is busy at delivery time.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal::unix::{Signal, SignalKind, signal};

use crate::kernel::Kernel;

/// Owns the SIGCHLD stream and pumps child events into a kernel.
pub struct Reactor {
    stream: Signal,
}

impl Reactor {
    /// Install the SIGCHLD stream. Must be called from within a tokio
    /// runtime. Failure here is fatal for the spooler: without the stream,
    /// job and printer state could never be reconciled.
    pub fn install() -> Result<Self> {
        let stream = signal(SignalKind::child())
            .context("failed to install SIGCHLD handler")?;
        Ok(Self { stream })
    }

    /// Run forever, reaping children on every signal edge.
    pub async fn run(mut self, kernel: Arc<Kernel>) {
        loop {
            if self.stream.recv().await.is_none() {
                tracing::warn!("SIGCHLD stream closed; reactor exiting");
                return;
            }
            let reaped = kernel.reap_children().await;
            tracing::debug!(reaped, "drained child events");
        }
    }
}
