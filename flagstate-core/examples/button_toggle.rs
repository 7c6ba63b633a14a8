//! Two-state toggle driven by simulated button presses.
//!
//! A producer thread stands in for a button interrupt and posts
//! `BUTTON_PRESS`; the machine toggles between `Off` and `On` on each press
//! and halts once the producer signals shutdown. Run with
//! `RUST_LOG=debug cargo run --example button_toggle` to watch every
//! dispatch and transition.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use flagstate_core::{
    event_flags, EventCatalog, EventMask, EventSet, Outcome, StateDef, StateMachine,
};
use tracing_subscriber::EnvFilter;

event_flags! {
    /// Events the toggle machine reacts to.
    pub enum ToggleEvent {
        ButtonPress = 0,
        Shutdown = 1,
    }
}

const PRESS_COUNT: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lamp {
    Off,
    On,
}

#[derive(Default)]
struct Ctx {
    presses: u32,
}

fn lamp_off(_ctx: &mut Ctx) {
    tracing::info!("lamp off");
}

fn lamp_on(_ctx: &mut Ctx) {
    tracing::info!("lamp on");
}

fn off_run(ctx: &mut Ctx, events: EventMask) -> Outcome<Lamp> {
    toggle(ctx, events, Lamp::On)
}

fn on_run(ctx: &mut Ctx, events: EventMask) -> Outcome<Lamp> {
    toggle(ctx, events, Lamp::Off)
}

// Presses and the shutdown flag can arrive coalesced in one mask, so count
// before deciding to halt.
fn toggle(ctx: &mut Ctx, events: EventMask, next: Lamp) -> Outcome<Lamp> {
    if events.contains(BUTTON_PRESS) {
        ctx.presses += 1;
    }
    if events.contains(SHUTDOWN) {
        Outcome::Halt(0)
    } else if events.contains(BUTTON_PRESS) {
        Outcome::Goto(next)
    } else {
        Outcome::Stay
    }
}

const TABLE: &[StateDef<Lamp, Ctx>] = &[
    StateDef::new(Lamp::Off, off_run).with_entry(lamp_off),
    StateDef::new(Lamp::On, on_run).with_entry(lamp_on),
];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let events = Arc::new(EventSet::new());
    let mut machine: StateMachine<Lamp, Ctx> =
        StateMachine::new(TABLE, Ctx::default(), Arc::clone(&events))?
            .with_catalog(EventCatalog::from_flags::<ToggleEvent>()?);
    machine.set_initial(Lamp::Off)?;

    // Stand-in for a button interrupt; posting never blocks the producer.
    let button = Arc::clone(&events);
    let presser = thread::spawn(move || {
        for _ in 0..PRESS_COUNT {
            thread::sleep(Duration::from_millis(120));
            button.post(BUTTON_PRESS);
        }
        button.post(SHUTDOWN);
    });

    let code = machine.run()?;
    tracing::info!(code, presses = machine.context().presses, "machine halted");
    presser.join().expect("button thread panicked");
    Ok(())
}
