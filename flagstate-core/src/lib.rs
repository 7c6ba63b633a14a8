// Copyright 2026 Flagstate Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Flagstate
//!
//! Run-to-completion state machines driven by coalescing event flags.
//!
//! The model comes from event-flag RTOS designs. Producers set bits in a
//! shared 32-bit [`EventSet`] from any thread; one consumer loop blocks
//! until at least one bit is set, captures and clears the whole mask in a
//! single atomic step and hands it to the current state's run handler.
//! A flag means "this happened at least once since you last looked", so a
//! burst of identical posts coalesces into one delivery instead of queueing.
//!
//! The pieces:
//!
//! - [`EventMask`] and [`event_flags!`] give events names and bit positions,
//!   checked for collisions at compile time. [`EventCatalog`] does the same
//!   check at runtime for events that only exist in configuration.
//! - [`EventSet`] is the accumulator producers post into and the machine
//!   waits on.
//! - [`StateDef`] rows form a `const`-constructible state table; each row is
//!   an optional entry hook, a run handler returning an [`Outcome`] and an
//!   optional exit hook. Run handlers are the only place transitions and
//!   halts can be requested.
//! - [`StateMachine`] owns the table, the shared context and the dispatch
//!   loop, either free-running ([`StateMachine::run`]) or one bounded cycle
//!   at a time ([`StateMachine::step`]).
//! - [`source`] holds thread-backed producers: a periodic [`source::Ticker`],
//!   a debounced [`source::EdgeWatcher`] and a [`source::OneShot`] readiness
//!   probe.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use flagstate_core::{
//!     event_flags, EventMask, EventSet, Outcome, StateDef, StateMachine, Step,
//! };
//!
//! event_flags! {
//!     pub enum AppEvent {
//!         ButtonPress = 0,
//!         Shutdown = 1,
//!     }
//! }
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Lamp {
//!     Off,
//!     On,
//! }
//!
//! #[derive(Default)]
//! struct Ctx {
//!     presses: u32,
//! }
//!
//! fn off_run(ctx: &mut Ctx, events: EventMask) -> Outcome<Lamp> {
//!     if events.contains(SHUTDOWN) {
//!         return Outcome::Halt(0);
//!     }
//!     ctx.presses += 1;
//!     Outcome::Goto(Lamp::On)
//! }
//!
//! fn on_run(ctx: &mut Ctx, events: EventMask) -> Outcome<Lamp> {
//!     if events.contains(SHUTDOWN) {
//!         return Outcome::Halt(0);
//!     }
//!     ctx.presses += 1;
//!     Outcome::Goto(Lamp::Off)
//! }
//!
//! const TABLE: &[StateDef<Lamp, Ctx>] = &[
//!     StateDef::new(Lamp::Off, off_run),
//!     StateDef::new(Lamp::On, on_run),
//! ];
//!
//! # fn main() -> Result<(), flagstate_core::MachineError> {
//! let events = Arc::new(EventSet::new());
//! let mut machine: StateMachine<Lamp, Ctx> =
//!     StateMachine::new(TABLE, Ctx::default(), Arc::clone(&events))?;
//! machine.set_initial(Lamp::Off)?;
//!
//! // Producers post bits; the machine consumes the coalesced mask.
//! events.post(BUTTON_PRESS);
//! assert_eq!(machine.step(Duration::ZERO)?, Step::Transitioned);
//! assert_eq!(machine.state(), Some(Lamp::On));
//!
//! events.post(SHUTDOWN);
//! assert_eq!(machine.run()?, 0);
//! assert_eq!(machine.context().presses, 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency model
//!
//! Many producers, one consumer. [`EventSet::post`] never blocks, which
//! makes it callable from timer callbacks and latency-sensitive threads;
//! everything stateful happens on the dispatch thread, so handlers need no
//! locking to touch the context. Posts are never lost: a bit set while the
//! consumer is busy stays pending for the next cycle.

pub mod event;
pub mod event_set;
pub mod machine;
pub mod source;
pub mod state;

#[cfg(feature = "diagram")]
pub mod diagram;

pub use event::{Bits, CatalogError, EventCatalog, EventFlag, EventMask};
pub use event_set::EventSet;
pub use machine::{MachineError, ObserverFn, StateMachine, Step};
pub use state::{HookFn, Outcome, RunFn, StateDef};

// Used by the expansion of `event_flags!`.
#[doc(hidden)]
pub use paste as __paste;
