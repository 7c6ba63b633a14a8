//! Periodic event source.

use core::time::Duration;

use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::{EventMask, EventSet};

/// Posts a fixed mask to an [`EventSet`] every period from its own thread.
///
/// The beat is measured from post to post, so a loaded system can stretch a
/// period but never shorten one. Ticks coalesce like any other flag: a slow
/// consumer sees "at least one tick elapsed", not a backlog of ticks.
///
/// Dropping the ticker stops the thread and waits for it to exit.
#[derive(Debug)]
pub struct Ticker {
    stop: mpsc::Sender<()>,
    worker: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawns the ticking thread.
    ///
    /// # Errors
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn(events: Arc<EventSet>, mask: EventMask, period: Duration) -> io::Result<Self> {
        let (stop, stopped) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("flagstate-ticker".into())
            .spawn(move || {
                tracing::debug!(?period, %mask, "ticker started");
                // recv_timeout doubles as the timebase and the stop signal.
                loop {
                    match stopped.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => events.post(mask),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!("ticker stopped");
            })?;
        Ok(Self {
            stop,
            worker: Some(worker),
        })
    }

    /// Stops the thread and waits for it to exit. Dropping does the same;
    /// this form just makes the point explicit at the call site.
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

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: EventMask = EventMask::bit(3);

    #[test]
    fn ticks_keep_coming() {
        let set = Arc::new(EventSet::new());
        let ticker = Ticker::spawn(Arc::clone(&set), TICK, Duration::from_millis(10)).unwrap();

        for _ in 0..3 {
            assert_eq!(set.wait(), TICK);
        }
        ticker.stop();
    }

    #[test]
    fn stop_silences_the_source() {
        let set = Arc::new(EventSet::new());
        let ticker = Ticker::spawn(Arc::clone(&set), TICK, Duration::from_millis(5)).unwrap();

        assert_eq!(set.wait(), TICK);
        ticker.stop();

        // Anything already posted is drained; after that the line is quiet.
        let _ = set.try_take();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(set.try_take(), EventMask::NONE);
    }

    #[test]
    fn drop_stops_the_thread() {
        let set = Arc::new(EventSet::new());
        {
            let _ticker = Ticker::spawn(Arc::clone(&set), TICK, Duration::from_millis(5)).unwrap();
            assert_eq!(set.wait(), TICK);
        }

        let _ = set.try_take();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(set.try_take(), EventMask::NONE);
    }
}
