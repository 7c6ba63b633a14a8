//! Wait for a link, then poll on a timer, driven entirely by event sources.
//!
//! A [`OneShot`] stands in for a network stack's "acquired an address"
//! callback and a [`Ticker`] provides the polling cadence. The machine waits
//! in `WaitingForLink` until the one-shot fires, then counts poll ticks and
//! halts after a handful. The attached [`EventCatalog`] makes dispatch
//! traces show event names instead of raw masks; try
//! `RUST_LOG=trace cargo run --example network_poll`.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use flagstate_core::source::{OneShot, Ticker};
use flagstate_core::{
    event_flags, EventCatalog, EventMask, EventSet, Outcome, StateDef, StateMachine,
};
use tracing_subscriber::EnvFilter;

event_flags! {
    /// Events in the connectivity machine.
    pub enum NetEvent {
        LinkUp = 0,
        PollTick = 1,
    }
}

const POLL_TARGET: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conn {
    WaitingForLink,
    Polling,
}

#[derive(Default)]
struct Ctx {
    polls: u32,
}

fn waiting_entry(_ctx: &mut Ctx) {
    tracing::info!("waiting for link");
}

fn waiting_run(_ctx: &mut Ctx, events: EventMask) -> Outcome<Conn> {
    if events.contains(LINK_UP) {
        Outcome::Goto(Conn::Polling)
    } else {
        // Ticks that arrive before the link is up are ignored here.
        Outcome::Stay
    }
}

fn polling_entry(_ctx: &mut Ctx) {
    tracing::info!("link is up, polling");
}

fn polling_run(ctx: &mut Ctx, events: EventMask) -> Outcome<Conn> {
    if events.contains(POLL_TICK) {
        ctx.polls += 1;
        tracing::info!(poll = ctx.polls, "poll cycle");
        if ctx.polls >= POLL_TARGET {
            return Outcome::Halt(0);
        }
    }
    Outcome::Stay
}

const TABLE: &[StateDef<Conn, Ctx>] = &[
    StateDef::new(Conn::WaitingForLink, waiting_run).with_entry(waiting_entry),
    StateDef::new(Conn::Polling, polling_run).with_entry(polling_entry),
];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let events = Arc::new(EventSet::new());
    let mut machine: StateMachine<Conn, Ctx> =
        StateMachine::new(TABLE, Ctx::default(), Arc::clone(&events))?
            .with_catalog(EventCatalog::from_flags::<NetEvent>()?);
    machine.set_initial(Conn::WaitingForLink)?;

    let link = OneShot::spawn(Arc::clone(&events), LINK_UP, || {
        // Pretend DHCP takes a moment.
        thread::sleep(Duration::from_millis(300));
    })?;
    let ticker = Ticker::spawn(Arc::clone(&events), POLL_TICK, Duration::from_millis(200))?;

    let code = machine.run()?;
    tracing::info!(code, polls = machine.context().polls, "machine halted");

    ticker.stop();
    link.join().expect("link probe panicked");
    Ok(())
}
