//! Edge-triggered event source for level-sampled inputs.

use core::time::Duration;

use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::{EventMask, EventSet};

/// Samples a boolean line and posts a mask on each rising edge.
///
/// The `sample` closure runs on the watcher's own thread once per `poll`
/// interval. A rising edge within `debounce` of the previously accepted one
/// is dropped, the usual treatment for bouncy mechanical inputs. The level
/// observed at spawn time is the baseline: a line that is already high posts
/// nothing until it falls and rises again.
///
/// Dropping the watcher stops the thread and waits for it to exit.
#[derive(Debug)]
pub struct EdgeWatcher {
    stop: mpsc::Sender<()>,
    worker: Option<JoinHandle<()>>,
}

impl EdgeWatcher {
    /// Spawns the sampling thread.
    ///
    /// # Errors
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn<F>(
        events: Arc<EventSet>,
        mask: EventMask,
        sample: F,
        poll: Duration,
        debounce: Duration,
    ) -> io::Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (stop, stopped) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("flagstate-edge".into())
            .spawn(move || {
                let mut sample = sample;
                let mut level = sample();
                let mut last_accepted: Option<Instant> = None;
                tracing::debug!(?poll, ?debounce, %mask, baseline = level, "edge watcher started");
                loop {
                    match stopped.recv_timeout(poll) {
                        Err(RecvTimeoutError::Timeout) => {
                            let high = sample();
                            if high && !level {
                                let now = Instant::now();
                                let accepted = last_accepted
                                    .is_none_or(|t| now.duration_since(t) >= debounce);
                                if accepted {
                                    events.post(mask);
                                    last_accepted = Some(now);
                                } else {
                                    tracing::trace!("edge inside debounce window dropped");
                                }
                            }
                            level = high;
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!("edge watcher stopped");
            })?;
        Ok(Self {
            stop,
            worker: Some(worker),
        })
    }

    /// Stops the thread and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop.send(());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for EdgeWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
