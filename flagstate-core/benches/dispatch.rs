use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use flagstate_core::{EventMask, EventSet, Outcome, StateDef, StateMachine};

fn event_set_round_trip(c: &mut Criterion) {
    let set = EventSet::new();
    c.bench_function("event_set_post_take", |b| {
        b.iter(|| {
            set.post(black_box(EventMask::bit(0)));
            black_box(set.try_take())
        });
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

fn left_run(_ctx: &mut (), _events: EventMask) -> Outcome<Side> {
    Outcome::Goto(Side::Right)
}

fn right_run(_ctx: &mut (), _events: EventMask) -> Outcome<Side> {
    Outcome::Goto(Side::Left)
}

const TABLE: &[StateDef<Side, ()>] = &[
    StateDef::new(Side::Left, left_run),
    StateDef::new(Side::Right, right_run),
];

fn machine_step(c: &mut Criterion) {
    let events = Arc::new(EventSet::new());
    let mut machine: StateMachine<Side, ()> =
        StateMachine::new(TABLE, (), Arc::clone(&events)).unwrap();
    machine.set_initial(Side::Left).unwrap();

    c.bench_function("machine_step_transition", |b| {
        b.iter(|| {
            events.post(EventMask::bit(0));
            black_box(machine.step(Duration::ZERO).unwrap())
        });
    });
}

criterion_group!(benches, event_set_round_trip, machine_step);
criterion_main!(benches);
