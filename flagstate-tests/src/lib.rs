//! Integration and property tests for flagstate
//!
//! This crate holds the tests that want heavier tooling than the core
//! crate's unit tests: multi-threaded end-to-end runs and property-based
//! checks of the event-set semantics.

#![cfg(test)]

pub mod integration;

/// Common test utilities and fixtures
pub mod common {
    use std::sync::Arc;

    use flagstate_core::{
        event_flags, EventCatalog, EventMask, EventSet, Outcome, StateDef, StateMachine,
    };
    use once_cell::sync::Lazy;

    /// Setup tracing for tests
    pub fn setup_tracing() {
        use tracing_subscriber::{fmt, EnvFilter};

        let _ = fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    event_flags! {
        /// Events shared by the fixture machines.
        pub enum TestEvent {
            Press = 0,
            Tick = 1,
            Quit = 2,
        }
    }

    /// Catalog over [`TestEvent`] for tests that assert on rendering.
    pub static CATALOG: Lazy<EventCatalog> =
        Lazy::new(|| EventCatalog::from_flags::<TestEvent>().expect("fixture flags are disjoint"));

    /// States of the toggle fixture.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TestState {
        Off,
        On,
    }

    /// Context of the toggle fixture.
    #[derive(Debug, Default)]
    pub struct TestCtx {
        pub log: heapless::Vec<&'static str, 64>,
        pub presses: u32,
    }

    fn note(ctx: &mut TestCtx, entry: &'static str) {
        ctx.log.push(entry).expect("fixture log overflow");
    }

    fn enter_off(ctx: &mut TestCtx) {
        note(ctx, "enter_off");
    }

    fn exit_off(ctx: &mut TestCtx) {
        note(ctx, "exit_off");
    }

    fn enter_on(ctx: &mut TestCtx) {
        note(ctx, "enter_on");
    }

    fn exit_on(ctx: &mut TestCtx) {
        note(ctx, "exit_on");
    }

    fn off_run(ctx: &mut TestCtx, events: EventMask) -> Outcome<TestState> {
        toggle_run(ctx, events, TestState::On)
    }

    fn on_run(ctx: &mut TestCtx, events: EventMask) -> Outcome<TestState> {
        toggle_run(ctx, events, TestState::Off)
    }

    // `Press` and `Quit` may arrive coalesced; the press is counted either
    // way and the quit wins.
    fn toggle_run(ctx: &mut TestCtx, events: EventMask, next: TestState) -> Outcome<TestState> {
        if events.contains(PRESS) {
            ctx.presses += 1;
        }
        if events.contains(QUIT) {
            Outcome::Halt(i32::try_from(ctx.presses).unwrap_or(i32::MAX))
        } else if events.contains(PRESS) {
            Outcome::Goto(next)
        } else {
            Outcome::Stay
        }
    }

    /// Two-state toggle over [`TestEvent`]: `Press` flips the state, `Quit`
    /// halts with the number of presses seen as the code.
    pub const TOGGLE_TABLE: &[StateDef<TestState, TestCtx>] = &[
        StateDef::new(TestState::Off, off_run)
            .with_entry(enter_off)
            .with_exit(exit_off),
        StateDef::new(TestState::On, on_run)
            .with_entry(enter_on)
            .with_exit(exit_on),
    ];

    /// A started toggle machine on the given event set.
    pub fn toggle_machine(events: &Arc<EventSet>) -> StateMachine<TestState, TestCtx> {
        let mut machine = StateMachine::new(TOGGLE_TABLE, TestCtx::default(), Arc::clone(events))
            .expect("fixture table is valid")
            .with_catalog(CATALOG.clone());
        machine
            .set_initial(TestState::Off)
            .expect("Off is in the table");
        machine
    }
}
