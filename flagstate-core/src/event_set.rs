//! # Event Set
//!
//! The rendezvous point between event producers and the machine's dispatch
//! loop. An [`EventSet`] is a 32-bit accumulator guarded by a mutex and a
//! condition variable: any number of threads post bits into it, one consumer
//! blocks until at least one bit is set and then takes the whole accumulated
//! mask in a single capture-and-clear step.
//!
//! Posts are never lost. A bit posted while the consumer is busy stays set
//! until the next wait; a bit posted twice before the consumer wakes is
//! delivered once. That coalescing is the point: flags carry "this happened
//! at least once since you last looked", not a count.

use core::mem;
use core::time::Duration;

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::EventMask;

/// A shared, coalescing accumulator of event bits.
///
/// Producers call [`post`](Self::post) from any thread, including from
/// callbacks running on foreign threads. The single consumer (normally a
/// [`StateMachine`](crate::StateMachine) loop) calls [`wait`](Self::wait) or
/// [`wait_timeout`](Self::wait_timeout) and receives everything accumulated
/// since its previous wait.
///
/// The set is usually shared behind an [`Arc`](std::sync::Arc):
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
/// use flagstate_core::{EventMask, EventSet};
///
/// let events = Arc::new(EventSet::new());
/// let producer = Arc::clone(&events);
///
/// let worker = thread::spawn(move || producer.post(EventMask::bit(0)));
///
/// assert_eq!(events.wait(), EventMask::bit(0));
/// worker.join().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct EventSet {
    pending: Mutex<u32>,
    waker: Condvar,
}

impl EventSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(0),
            waker: Condvar::new(),
        }
    }

    /// Ors `mask` into the pending bits and wakes the consumer.
    ///
    /// Never blocks and never fails, which makes it safe to call from
    /// latency-sensitive producer threads. Posting an empty mask is a no-op.
    pub fn post(&self, mask: EventMask) {
        if mask.is_empty() {
            return;
        }
        let mut pending = self.lock();
        *pending |= mask.bits();
        drop(pending);
        self.waker.notify_all();
    }

    /// Blocks until at least one bit is pending, then takes the whole mask.
    ///
    /// Capture and clear happen under one lock acquisition, so a post can
    /// never fall between "read the bits" and "clear the bits". Bits posted
    /// after the capture are simply pending for the next wait.
    pub fn wait(&self) -> EventMask {
        let mut pending = self
            .waker
            .wait_while(self.lock(), |bits| *bits == 0)
            .unwrap_or_else(PoisonError::into_inner);
        EventMask::from_bits(mem::take(&mut *pending))
    }

    /// As [`wait`](Self::wait), but gives up after `timeout`.
    ///
    /// Returns [`EventMask::NONE`] on expiry. A zero timeout degenerates to a
    /// non-blocking poll.
    pub fn wait_timeout(&self, timeout: Duration) -> EventMask {
        let (mut pending, _timed_out) = self
            .waker
            .wait_timeout_while(self.lock(), timeout, |bits| *bits == 0)
            .unwrap_or_else(PoisonError::into_inner);
        EventMask::from_bits(mem::take(&mut *pending))
    }

    /// Takes the pending mask without blocking.
    ///
    /// Returns [`EventMask::NONE`] if nothing is pending.
    pub fn try_take(&self) -> EventMask {
        EventMask::from_bits(mem::take(&mut *self.lock()))
    }

    /// Peeks at the pending mask without clearing it.
    ///
    /// Diagnostic only: by the time the caller looks at the result another
    /// thread may already have posted more bits.
    #[must_use]
    pub fn pending(&self) -> EventMask {
        EventMask::from_bits(*self.lock())
    }

    // A poisoned lock means a producer panicked while holding it. The guarded
    // value is a bare u32 that is valid under any interleaving, so waiting
    // consumers keep going instead of propagating the panic.
    fn lock(&self) -> MutexGuard<'_, u32> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    const A: EventMask = EventMask::bit(0);
    const B: EventMask = EventMask::bit(1);
    const C: EventMask = EventMask::bit(17);

    #[test]
    fn repeated_posts_coalesce() {
        let set = EventSet::new();
        set.post(A);
        set.post(A);
        set.post(A);

        assert_eq!(set.wait(), A);
        assert_eq!(set.try_take(), EventMask::NONE);
    }

    #[test]
    fn distinct_posts_merge() {
        let set = EventSet::new();
        set.post(A);
        set.post(B | C);

        assert_eq!(set.pending(), A | B | C);
        assert_eq!(set.wait(), A | B | C);
        assert_eq!(set.pending(), EventMask::NONE);
    }

    #[test]
    fn empty_post_is_a_no_op() {
        let set = EventSet::new();
        set.post(EventMask::NONE);
        assert_eq!(set.try_take(), EventMask::NONE);
    }

    #[test]
    fn wait_wakes_on_post_from_another_thread() {
        let set = Arc::new(EventSet::new());
        let producer = Arc::clone(&set);

        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            producer.post(B);
        });

        assert_eq!(set.wait(), B);
        worker.join().unwrap();
    }

    #[test]
    fn wait_timeout_expires_empty() {
        let set = EventSet::new();
        let start = Instant::now();

        assert_eq!(set.wait_timeout(Duration::from_millis(20)), EventMask::NONE);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn wait_timeout_returns_early_when_bits_arrive() {
        let set = Arc::new(EventSet::new());
        let producer = Arc::clone(&set);

        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            producer.post(A | C);
        });

        assert_eq!(set.wait_timeout(Duration::from_secs(10)), A | C);
        worker.join().unwrap();
    }

    #[test]
    fn zero_timeout_polls() {
        let set = EventSet::new();
        assert_eq!(set.wait_timeout(Duration::ZERO), EventMask::NONE);

        set.post(C);
        assert_eq!(set.wait_timeout(Duration::ZERO), C);
    }

    #[test]
    fn posts_from_many_threads_all_arrive() {
        let set = Arc::new(EventSet::new());
        let mut workers = Vec::new();
        for pos in 0..8u8 {
            let producer = Arc::clone(&set);
            workers.push(thread::spawn(move || producer.post(EventMask::bit(pos))));
        }
        for worker in workers {
            worker.join().unwrap();
        }

        let mut seen = EventMask::NONE;
        while seen != EventMask::from_bits(0xFF) {
            let taken = set.wait_timeout(Duration::from_secs(5));
            assert!(!taken.is_empty(), "posted bits went missing");
            seen |= taken;
        }
    }

    #[test]
    fn post_during_dispatch_is_kept_for_next_wait() {
        let set = EventSet::new();
        set.post(A);

        let first = set.wait();
        assert_eq!(first, A);

        // Consumer is "busy running handlers" here; a new post must not be
        // folded into the mask already captured.
        set.post(B);
        assert_eq!(first, A);
        assert_eq!(set.wait(), B);
    }
}
