//! One-time event source for "became ready" conditions.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::{EventMask, EventSet};

/// Runs a blocking readiness probe once and posts a mask when it returns.
///
/// This adapts callback- or poll-until-ready origins, such as a network
/// stack acquiring an address, into a single flag: wrap the blocking wait in
/// `ready` and the consumer sees one posted bit. If `ready` panics, nothing
/// is posted and [`join`](Self::join) surfaces the panic.
///
/// Unlike the looping sources, dropping a `OneShot` detaches the worker
/// instead of joining it. A probe that never returns parks its thread but
/// cannot stall the thread that dropped the handle.
#[derive(Debug)]
pub struct OneShot {
    worker: JoinHandle<()>,
}

impl OneShot {
    /// Spawns the probe thread.
    ///
    /// # Errors
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn<F>(events: Arc<EventSet>, mask: EventMask, ready: F) -> io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let worker = thread::Builder::new()
            .name("flagstate-oneshot".into())
            .spawn(move || {
                ready();
                events.post(mask);
                tracing::debug!(%mask, "one-shot fired");
            })?;
        Ok(Self { worker })
    }

    /// `true` once the worker thread has finished, normally right after
    /// posting.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.worker.is_finished()
    }

    /// Blocks until the probe finishes.
    ///
    /// # Errors
    /// Forwards the probe's panic payload if it panicked.
    pub fn join(self) -> thread::Result<()> {
        self.worker.join()
    }
}
