//! # State Definitions
//!
//! A state is a triple of plain function pointers over a shared context type:
//! an optional entry hook, a required run handler and an optional exit hook.
//! Definitions are `const`-constructible, so a whole state table can live in
//! a `static` the way fixed tables usually do in firmware-style code.

use core::fmt;

use crate::EventMask;

/// The run handler of a state.
///
/// Receives the context and the full coalesced event mask captured for this
/// dispatch cycle. Its return value is the only place a transition or a halt
/// can be requested.
///
/// Handlers run on the dispatch thread and must not block: while one is
/// executing, no further events are consumed.
pub type RunFn<S, C> = fn(&mut C, EventMask) -> Outcome<S>;

/// An entry or exit hook. Hooks adjust the context; they cannot transition.
/// Like run handlers, they execute on the dispatch thread and must not block.
pub type HookFn<C> = fn(&mut C);

/// What a run handler wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<S> {
    /// Remain in the current state.
    Stay,
    /// Transition to the named state. Naming the current state is a
    /// self-transition: exit and entry hooks run again.
    Goto(S),
    /// Stop the machine for good, yielding `code` from
    /// [`StateMachine::run`](crate::StateMachine::run). The current state's
    /// exit hook does not run; the machine freezes where it halted.
    Halt(i32),
}

/// One row of a state table.
///
/// `S` is the application's state identifier (a small `Copy` enum), `C` the
/// context shared by every handler. Rows are built in `const` position:
///
/// ```
/// use flagstate_core::{EventMask, Outcome, StateDef};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum Door { Closed, Open }
///
/// struct Ctx { openings: u32 }
///
/// fn closed_run(_ctx: &mut Ctx, _events: EventMask) -> Outcome<Door> {
///     Outcome::Goto(Door::Open)
/// }
///
/// fn open_entry(ctx: &mut Ctx) {
///     ctx.openings += 1;
/// }
///
/// fn open_run(_ctx: &mut Ctx, _events: EventMask) -> Outcome<Door> {
///     Outcome::Halt(0)
/// }
///
/// const TABLE: &[StateDef<Door, Ctx>] = &[
///     StateDef::new(Door::Closed, closed_run),
///     StateDef::new(Door::Open, open_run).with_entry(open_entry),
/// ];
/// # assert_eq!(TABLE.len(), 2);
/// ```
pub struct StateDef<S, C> {
    /// Identifier this row answers to.
    pub id: S,
    /// Runs once when the state is entered, before any event is waited on.
    pub on_entry: Option<HookFn<C>>,
    /// Runs once per dispatch cycle while this state is current.
    pub on_run: RunFn<S, C>,
    /// Runs when the state is left through a transition.
    pub on_exit: Option<HookFn<C>>,
}

impl<S, C> StateDef<S, C> {
    /// A state with a run handler and no hooks.
    #[must_use]
    pub const fn new(id: S, on_run: RunFn<S, C>) -> Self {
        Self {
            id,
            on_entry: None,
            on_run,
            on_exit: None,
        }
    }

    /// Adds an entry hook.
    #[must_use]
    pub const fn with_entry(mut self, hook: HookFn<C>) -> Self {
        self.on_entry = Some(hook);
        self
    }

    /// Adds an exit hook.
    #[must_use]
    pub const fn with_exit(mut self, hook: HookFn<C>) -> Self {
        self.on_exit = Some(hook);
        self
    }
}

// Derived Copy/Clone would demand C: Copy, but C only appears behind function
// pointers here.
impl<S: Copy, C> Copy for StateDef<S, C> {}

impl<S: Copy, C> Clone for StateDef<S, C> {
    fn clone(&self) -> Self {
        *self
    }
}

// Function pointers only Debug-print as addresses, which makes table dumps
// noisy. Print the hook slots as present/absent instead.
impl<S: fmt::Debug, C> fmt::Debug for StateDef<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateDef")
            .field("id", &self.id)
            .field("on_entry", &self.on_entry.is_some())
            .field("on_exit", &self.on_exit.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Demo {
        Idle,
    }

    struct Ctx {
        entered: bool,
        exited: bool,
    }

    fn run(_ctx: &mut Ctx, _events: EventMask) -> Outcome<Demo> {
        Outcome::Stay
    }

    fn enter(ctx: &mut Ctx) {
        ctx.entered = true;
    }

    fn leave(ctx: &mut Ctx) {
        ctx.exited = true;
    }

    const PLAIN: StateDef<Demo, Ctx> = StateDef::new(Demo::Idle, run);
    const FULL: StateDef<Demo, Ctx> = StateDef::new(Demo::Idle, run)
        .with_entry(enter)
        .with_exit(leave);

    #[test]
    fn const_construction() {
        assert!(PLAIN.on_entry.is_none());
        assert!(PLAIN.on_exit.is_none());
        assert!(FULL.on_entry.is_some());
        assert!(FULL.on_exit.is_some());
    }

    #[test]
    fn hooks_are_callable() {
        let mut ctx = Ctx {
            entered: false,
            exited: false,
        };
        if let Some(hook) = FULL.on_entry {
            hook(&mut ctx);
        }
        if let Some(hook) = FULL.on_exit {
            hook(&mut ctx);
        }
        assert!(ctx.entered);
        assert!(ctx.exited);
        assert_eq!((FULL.on_run)(&mut ctx, EventMask::NONE), Outcome::Stay);
    }

    #[test]
    fn rows_are_copy() {
        let copy = FULL;
        let again = copy;
        assert_eq!(again.id, Demo::Idle);
    }

    #[test]
    fn debug_elides_function_pointers() {
        let rendered = format!("{FULL:?}");
        assert_eq!(
            rendered,
            "StateDef { id: Idle, on_entry: true, on_exit: true }"
        );
    }
}
