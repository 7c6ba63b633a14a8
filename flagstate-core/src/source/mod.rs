//! # Event Sources
//!
//! Producer-side adapters that turn external stimuli into event flags. Each
//! source owns a worker thread and a clone of the machine's
//! [`EventSet`](crate::EventSet) handle; the machine never knows whether a
//! flag came from a timer, a sampled input line or a blocking readiness
//! probe.
//!
//! Sources are optional plumbing. Anything that can call
//! [`EventSet::post`](crate::EventSet::post) is a valid producer.

pub mod edge;
pub mod oneshot;
pub mod ticker;

pub use edge::EdgeWatcher;
pub use oneshot::OneShot;
pub use ticker::Ticker;
