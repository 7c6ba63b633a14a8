//! # State Machine
//!
//! Ties a state table, a context value and an [`EventSet`] into a
//! run-to-completion dispatch loop. Each cycle blocks on the set, captures
//! the coalesced mask and hands it to the current state's run handler exactly
//! once. Handlers finish before the next wait begins, so the context is only
//! ever touched from the dispatch thread.

use core::fmt;
use core::time::Duration;

use std::sync::Arc;

use thiserror::Error;

use crate::event::EventCatalog;
use crate::event_set::EventSet;
use crate::state::{Outcome, StateDef};
use crate::EventMask;

/// Observer for transitions, called as `(from, to)` after the target state's
/// entry hook has run.
pub type ObserverFn<S> = fn(S, S);

/// Errors from building or driving a [`StateMachine`].
///
/// All of these are wiring mistakes. Event-driven behavior never surfaces
/// here; a handler that wants to stop the machine does so through
/// [`Outcome::Halt`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MachineError {
    /// The state table had no rows.
    #[error("state table is empty")]
    EmptyStateTable,
    /// The state table did not fit the machine's capacity.
    #[error("state table holds {needed} rows but machine capacity is {capacity}")]
    TableOverflow { needed: usize, capacity: usize },
    /// Two table rows answered to the same identifier.
    #[error("duplicate state `{id}` in table")]
    DuplicateState { id: String },
    /// A state identifier that is not in the table.
    #[error("state `{id}` is not in the table")]
    UnknownState { id: String },
    /// `set_initial` was called on a machine that is already running.
    #[error("initial state was already set")]
    AlreadyStarted,
    /// The machine was driven before `set_initial`.
    #[error("set_initial was not called")]
    NotStarted,
    /// The machine was driven after it halted.
    #[error("machine has already halted")]
    AlreadyHalted,
}

/// What one dispatch cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The wait expired before any event arrived. No handler ran.
    TimedOut,
    /// The run handler saw the mask and kept its state.
    Stayed,
    /// The run handler requested a transition and the hooks have run.
    Transitioned,
    /// The run handler halted the machine with this code.
    Halted(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Running,
    Halted,
}

/// An event-driven finite state machine.
///
/// `S` is the state identifier, `C` the context every handler shares and `N`
/// the table capacity (default 8 rows). The machine owns its context and a
/// handle to the [`EventSet`] it consumes from; producers keep their own
/// clones of the same `Arc`.
///
/// # Lifecycle
///
/// A machine is built with [`new`](Self::new), armed with
/// [`set_initial`](Self::set_initial) (which runs the initial state's entry
/// hook, before any event can be consumed) and then driven either by
/// [`run`](Self::run) until a handler halts it, or cycle by cycle with
/// [`step`](Self::step). Once halted it stays halted.
///
/// ```no_run
/// use std::sync::Arc;
/// use flagstate_core::{EventMask, EventSet, Outcome, StateDef, StateMachine};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum App { Main }
///
/// fn main_run(count: &mut u32, _events: EventMask) -> Outcome<App> {
///     *count += 1;
///     if *count == 3 { Outcome::Halt(0) } else { Outcome::Stay }
/// }
///
/// const TABLE: &[StateDef<App, u32>] = &[StateDef::new(App::Main, main_run)];
///
/// fn main() -> Result<(), flagstate_core::MachineError> {
///     let events = Arc::new(EventSet::new());
///     let mut machine: StateMachine<App, u32> =
///         StateMachine::new(TABLE, 0, Arc::clone(&events))?;
///     machine.set_initial(App::Main)?;
///     let code = machine.run()?;
///     assert_eq!(code, 0);
///     Ok(())
/// }
/// ```
pub struct StateMachine<S, C, const N: usize = 8> {
    table: heapless::Vec<StateDef<S, C>, N>,
    context: C,
    events: Arc<EventSet>,
    catalog: Option<EventCatalog>,
    observer: Option<ObserverFn<S>>,
    phase: Phase,
    current: usize,
    halt_code: Option<i32>,
}

impl<S, C, const N: usize> StateMachine<S, C, N>
where
    S: Copy + PartialEq + fmt::Debug,
{
    /// Builds a machine over `table`, taking ownership of `context`.
    ///
    /// The table is validated up front so that a `Goto` between table states
    /// can only fail if the handler names an identifier the table never had.
    ///
    /// # Errors
    /// Returns [`MachineError::EmptyStateTable`] for an empty table,
    /// [`MachineError::DuplicateState`] if two rows share an identifier and
    /// [`MachineError::TableOverflow`] if the table exceeds `N` rows.
    pub fn new(
        table: &[StateDef<S, C>],
        context: C,
        events: Arc<EventSet>,
    ) -> Result<Self, MachineError> {
        if table.is_empty() {
            return Err(MachineError::EmptyStateTable);
        }
        for (i, row) in table.iter().enumerate() {
            if table[..i].iter().any(|prev| prev.id == row.id) {
                return Err(MachineError::DuplicateState {
                    id: format!("{:?}", row.id),
                });
            }
        }
        let rows = heapless::Vec::from_slice(table).map_err(|_| MachineError::TableOverflow {
            needed: table.len(),
            capacity: N,
        })?;
        Ok(Self {
            table: rows,
            context,
            events,
            catalog: None,
            observer: None,
            phase: Phase::Uninitialized,
            current: 0,
            halt_code: None,
        })
    }

    /// Attaches an [`EventCatalog`] so dispatch traces show event names
    /// instead of raw masks.
    #[must_use]
    pub fn with_catalog(mut self, catalog: EventCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Attaches a transition observer.
    #[must_use]
    pub fn with_observer(mut self, observer: ObserverFn<S>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Enters the initial state.
    ///
    /// Runs that state's entry hook exactly once, before any event can be
    /// consumed. Events posted to the set before this call are not lost;
    /// they are simply pending for the first dispatch cycle.
    ///
    /// # Errors
    /// Returns [`MachineError::UnknownState`] if `id` is not in the table,
    /// [`MachineError::AlreadyStarted`] on a second call and
    /// [`MachineError::AlreadyHalted`] after a halt.
    pub fn set_initial(&mut self, id: S) -> Result<(), MachineError> {
        match self.phase {
            Phase::Running => return Err(MachineError::AlreadyStarted),
            Phase::Halted => return Err(MachineError::AlreadyHalted),
            Phase::Uninitialized => {}
        }
        let Some(index) = self.index_of(id) else {
            return Err(MachineError::UnknownState {
                id: format!("{id:?}"),
            });
        };
        self.phase = Phase::Running;
        self.current = index;
        tracing::debug!(state = ?id, "initial state");
        if let Some(hook) = self.table[index].on_entry {
            hook(&mut self.context);
        }
        Ok(())
    }

    /// Runs the dispatch loop until a handler halts the machine, returning
    /// the halt code.
    ///
    /// Blocks on the event set between cycles; every captured mask is handed
    /// to exactly one run handler invocation.
    ///
    /// # Errors
    /// Returns [`MachineError::NotStarted`] before `set_initial`,
    /// [`MachineError::AlreadyHalted`] after a halt and
    /// [`MachineError::UnknownState`] if a handler names a transition target
    /// that is not in the table. The last case also halts the machine.
    pub fn run(&mut self) -> Result<i32, MachineError> {
        self.ensure_running()?;
        loop {
            let events = self.events.wait();
            if let Step::Halted(code) = self.dispatch(events)? {
                return Ok(code);
            }
        }
    }

    /// Performs at most one dispatch cycle, waiting up to `timeout` for
    /// events.
    ///
    /// On expiry the cycle reports [`Step::TimedOut`] and no handler runs;
    /// a timeout is a scheduling observation, not an event. Useful for
    /// driving a machine from a caller that multiplexes other work, and for
    /// tests.
    ///
    /// # Errors
    /// Same as [`run`](Self::run).
    pub fn step(&mut self, timeout: Duration) -> Result<Step, MachineError> {
        self.ensure_running()?;
        let events = self.events.wait_timeout(timeout);
        if events.is_empty() {
            return Ok(Step::TimedOut);
        }
        self.dispatch(events)
    }

    /// The identifier of the current state, or `None` before `set_initial`.
    #[must_use]
    pub fn state(&self) -> Option<S> {
        match self.phase {
            Phase::Uninitialized => None,
            Phase::Running | Phase::Halted => Some(self.table[self.current].id),
        }
    }

    /// Shared view of the context.
    #[must_use]
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Exclusive view of the context.
    ///
    /// Handlers own the context during dispatch; this accessor is for
    /// inspecting or seeding it between cycles.
    #[must_use]
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// The event set this machine consumes from. Clone the `Arc` to hand it
    /// to producers.
    #[must_use]
    pub fn events(&self) -> &Arc<EventSet> {
        &self.events
    }

    /// `true` between `set_initial` and a halt.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// `true` once a handler halted the machine or a transition failed.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.phase == Phase::Halted
    }

    /// The code a handler halted with, if any. A machine halted by a failed
    /// transition has no code.
    #[must_use]
    pub fn halt_code(&self) -> Option<i32> {
        self.halt_code
    }

    fn ensure_running(&self) -> Result<(), MachineError> {
        match self.phase {
            Phase::Uninitialized => Err(MachineError::NotStarted),
            Phase::Halted => Err(MachineError::AlreadyHalted),
            Phase::Running => Ok(()),
        }
    }

    fn index_of(&self, id: S) -> Option<usize> {
        self.table.iter().position(|row| row.id == id)
    }

    fn dispatch(&mut self, events: EventMask) -> Result<Step, MachineError> {
        let state = self.table[self.current];
        match &self.catalog {
            Some(catalog) => {
                tracing::trace!(state = ?state.id, events = %catalog.render(events), "dispatch");
            }
            None => tracing::trace!(state = ?state.id, %events, "dispatch"),
        }
        match (state.on_run)(&mut self.context, events) {
            Outcome::Stay => Ok(Step::Stayed),
            Outcome::Goto(next) => {
                self.transition(next)?;
                Ok(Step::Transitioned)
            }
            Outcome::Halt(code) => {
                self.phase = Phase::Halted;
                self.halt_code = Some(code);
                tracing::info!(code, state = ?state.id, "machine halted");
                Ok(Step::Halted(code))
            }
        }
    }

    // A failed transition leaves no state to be in, so the machine halts
    // without a code rather than keep dispatching from a stale row.
    fn transition(&mut self, next: S) -> Result<(), MachineError> {
        let Some(target) = self.index_of(next) else {
            self.phase = Phase::Halted;
            tracing::error!(to = ?next, "transition to unknown state");
            return Err(MachineError::UnknownState {
                id: format!("{next:?}"),
            });
        };
        let from = self.table[self.current];
        if let Some(hook) = from.on_exit {
            hook(&mut self.context);
        }
        self.current = target;
        let to = self.table[target];
        if let Some(hook) = to.on_entry {
            hook(&mut self.context);
        }
        tracing::debug!(from = ?from.id, to = ?to.id, "transition");
        if let Some(observer) = self.observer {
            observer(from.id, to.id);
        }
        Ok(())
    }
}

impl<S, C, const N: usize> fmt::Debug for StateMachine<S, C, N>
where
    S: Copy + PartialEq + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("table", &self.table.as_slice())
            .field("phase", &self.phase)
            .field("state", &self.state())
            .field("halt_code", &self.halt_code)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "diagram")]
impl<S, C, const N: usize> StateMachine<S, C, N>
where
    S: Copy + PartialEq + fmt::Debug,
{
    /// Snapshot of the machine's structure for rendering or export.
    #[must_use]
    pub fn diagram(&self) -> crate::diagram::Diagram {
        use crate::diagram::{Diagram, EventView, StateView};

        let current = self.state();
        Diagram {
            states: self
                .table
                .iter()
                .map(|row| StateView {
                    id: format!("{:?}", row.id),
                    has_entry: row.on_entry.is_some(),
                    has_exit: row.on_exit.is_some(),
                    current: current == Some(row.id),
                })
                .collect(),
            events: self
                .catalog
                .iter()
                .flat_map(EventCatalog::entries)
                .map(|(name, bit)| EventView {
                    name: name.to_owned(),
                    bit,
                })
                .collect(),
            halted: self.phase == Phase::Halted,
        }
    }
}
