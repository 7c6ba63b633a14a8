//! End-to-end tests wiring machines, event sets and sources together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use flagstate_core::source::{EdgeWatcher, OneShot, Ticker};
use flagstate_core::{EventMask, EventSet, Step};

use crate::common::*;

#[test]
fn press_sequence_follows_exit_entry_order() -> anyhow::Result<()> {
    setup_tracing();

    let events = Arc::new(EventSet::new());
    let mut machine = toggle_machine(&events);

    events.post(PRESS);
    assert_eq!(machine.step(Duration::ZERO)?, Step::Transitioned);
    events.post(PRESS);
    assert_eq!(machine.step(Duration::ZERO)?, Step::Transitioned);

    assert_eq!(machine.state(), Some(TestState::Off));
    assert_eq!(
        machine.context().log.as_slice(),
        ["enter_off", "exit_off", "enter_on", "exit_on", "enter_off"],
        "hooks must run in exit-then-entry order, starting with the initial entry"
    );
    Ok(())
}

#[test]
fn coalesced_quit_still_counts_the_press() -> anyhow::Result<()> {
    setup_tracing();

    let events = Arc::new(EventSet::new());
    let mut machine = toggle_machine(&events);

    events.post(PRESS);
    assert_eq!(machine.step(Duration::ZERO)?, Step::Transitioned);

    // One mask carrying both flags reaches a single handler invocation.
    events.post(PRESS | QUIT);
    assert_eq!(machine.step(Duration::ZERO)?, Step::Halted(2));
    assert_eq!(machine.halt_code(), Some(2));
    assert!(machine.is_halted());
    Ok(())
}

#[test]
fn timeout_is_an_observation_not_an_event() -> anyhow::Result<()> {
    setup_tracing();

    let events = Arc::new(EventSet::new());
    let mut machine = toggle_machine(&events);

    assert_eq!(machine.step(Duration::from_millis(20))?, Step::TimedOut);
    assert_eq!(
        machine.context().log.as_slice(),
        ["enter_off"],
        "no handler may run on a timed-out cycle"
    );

    // An unrecognized flag still reaches the handler, which stays.
    events.post(TICK);
    assert_eq!(machine.step(Duration::ZERO)?, Step::Stayed);
    assert_eq!(machine.state(), Some(TestState::Off));
    Ok(())
}

#[test]
fn oneshot_and_ticker_drive_a_free_running_machine() {
    setup_tracing();

    let events = Arc::new(EventSet::new());
    let mut machine = toggle_machine(&events);

    // Ticks are noise to the toggle fixture; the one-shot ends the run.
    let ticker = Ticker::spawn(Arc::clone(&events), TICK, Duration::from_millis(10))
        .expect("spawn ticker");
    let quitter = OneShot::spawn(Arc::clone(&events), QUIT, || {
        thread::sleep(Duration::from_millis(80));
    })
    .expect("spawn one-shot");

    let code = machine.run().expect("run to halt");
    tracing::info!(code, "free-running machine halted");
    assert_eq!(code, 0, "no presses were posted");
    assert!(machine.is_halted());

    ticker.stop();
    quitter.join().expect("one-shot probe panicked");
}

#[test]
fn edge_watcher_feeds_the_machine() {
    setup_tracing();

    let events = Arc::new(EventSet::new());
    let mut machine = toggle_machine(&events);

    let line = Arc::new(AtomicBool::new(false));
    let sampled = Arc::clone(&line);
    let watcher = EdgeWatcher::spawn(
        Arc::clone(&events),
        PRESS,
        move || sampled.load(Ordering::SeqCst),
        Duration::from_millis(5),
        Duration::ZERO,
    )
    .expect("spawn edge watcher");

    let wiggler = {
        let line = Arc::clone(&line);
        let events = Arc::clone(&events);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            line.store(true, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(30));
            line.store(false, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(30));
            line.store(true, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(30));
            events.post(QUIT);
        })
    };

    let code = machine.run().expect("run to halt");
    // Two rising edges were produced; they may coalesce into one dispatch.
    assert!((1..=2).contains(&code), "unexpected press count {code}");

    wiggler.join().expect("wiggler panicked");
    watcher.stop();
}

#[test]
fn catalog_renders_fixture_names() {
    assert_eq!(CATALOG.render(PRESS | QUIT), "Press|Quit");
    assert_eq!(CATALOG.render(TestEvent::ANY), "Press|Tick|Quit");
    assert_eq!(CATALOG.render(EventMask::NONE), "(none)");
}

#[test]
fn pending_events_survive_a_slow_start() {
    setup_tracing();

    let events = Arc::new(EventSet::new());

    // Producers are already live before the consumer gets around to
    // starting; nothing they post may be lost.
    let early = {
        let events = Arc::clone(&events);
        thread::spawn(move || events.post(PRESS))
    };
    early.join().expect("producer panicked");

    let mut machine = toggle_machine(&events);
    assert_eq!(machine.step(Duration::ZERO).unwrap(), Step::Transitioned);
    assert_eq!(machine.state(), Some(TestState::On));
}
