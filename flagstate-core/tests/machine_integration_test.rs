// flagstate-core/tests/machine_integration_test.rs

#[cfg(test)]
pub mod machine_integration_test {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use flagstate_core::source::Ticker;
    use flagstate_core::{EventMask, EventSet, MachineError, Outcome, StateDef, StateMachine};

    const PRESS: EventMask = EventMask::bit(0);
    const ACK: EventMask = EventMask::bit(0);
    const PRESS_TARGET: u32 = 25;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Pump {
        Pumping,
    }

    struct PumpCtx {
        acks: Arc<EventSet>,
        presses: u32,
    }

    fn pump_run(ctx: &mut PumpCtx, events: EventMask) -> Outcome<Pump> {
        if events.contains(PRESS) {
            ctx.presses += 1;
            // Posting back is fine inside a handler; posts never block.
            ctx.acks.post(ACK);
            if ctx.presses == PRESS_TARGET {
                return Outcome::Halt(42);
            }
        }
        Outcome::Stay
    }

    const PUMP_TABLE: &[StateDef<Pump, PumpCtx>] = &[StateDef::new(Pump::Pumping, pump_run)];

    // Producer and machine live on different threads; the ack set keeps them
    // in lockstep so every press is observed as its own dispatch cycle.
    #[test]
    fn threaded_producer_drives_machine_to_halt() {
        let events = Arc::new(EventSet::new());
        let acks = Arc::new(EventSet::new());

        let consumer = {
            let events = Arc::clone(&events);
            let acks = Arc::clone(&acks);
            thread::spawn(move || -> Result<(i32, u32), MachineError> {
                let mut machine: StateMachine<Pump, PumpCtx> =
                    StateMachine::new(PUMP_TABLE, PumpCtx { acks, presses: 0 }, events)?;
                machine.set_initial(Pump::Pumping)?;
                let code = machine.run()?;
                Ok((code, machine.context().presses))
            })
        };

        for _ in 0..PRESS_TARGET {
            events.post(PRESS);
            assert_eq!(acks.wait(), ACK, "press was not acknowledged");
        }

        let (code, presses) = consumer.join().expect("machine thread panicked").unwrap();
        assert_eq!(code, 42);
        assert_eq!(presses, PRESS_TARGET, "lockstep presses must not coalesce");
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Clock {
        Counting,
    }

    #[derive(Default)]
    struct ClockCtx {
        ticks: u32,
    }

    const TICK: EventMask = EventMask::bit(1);

    fn counting_run(ctx: &mut ClockCtx, events: EventMask) -> Outcome<Clock> {
        if events.contains(TICK) {
            ctx.ticks += 1;
            if ctx.ticks == 5 {
                return Outcome::Halt(0);
            }
        }
        Outcome::Stay
    }

    const CLOCK_TABLE: &[StateDef<Clock, ClockCtx>] =
        &[StateDef::new(Clock::Counting, counting_run)];

    // Coalescing may fold bursts of ticks into one dispatch, but the beat
    // keeps coming, so the count always gets to five.
    #[test]
    fn ticker_drives_the_loop_until_halt() {
        let events = Arc::new(EventSet::new());
        let mut machine: StateMachine<Clock, ClockCtx> =
            StateMachine::new(CLOCK_TABLE, ClockCtx::default(), Arc::clone(&events)).unwrap();
        machine.set_initial(Clock::Counting).unwrap();

        let ticker = Ticker::spawn(Arc::clone(&events), TICK, Duration::from_millis(5)).unwrap();

        assert_eq!(machine.run().unwrap(), 0);
        assert_eq!(machine.context().ticks, 5);
        assert_eq!(machine.halt_code(), Some(0));
        ticker.stop();
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Gather {
        Collecting,
    }

    #[derive(Default)]
    struct GatherCtx {
        seen: EventMask,
    }

    const WANTED: EventMask = EventMask::from_bits(0b1111);

    fn collecting_run(ctx: &mut GatherCtx, events: EventMask) -> Outcome<Gather> {
        ctx.seen |= events & WANTED;
        if ctx.seen == WANTED {
            Outcome::Halt(0)
        } else {
            Outcome::Stay
        }
    }

    const GATHER_TABLE: &[StateDef<Gather, GatherCtx>] =
        &[StateDef::new(Gather::Collecting, collecting_run)];

    // One post per producer thread, no pacing at all. However the posts
    // interleave or coalesce, every bit must eventually be delivered.
    #[test]
    fn scattered_producers_are_all_heard() {
        let events = Arc::new(EventSet::new());
        let mut machine: StateMachine<Gather, GatherCtx> =
            StateMachine::new(GATHER_TABLE, GatherCtx::default(), Arc::clone(&events)).unwrap();
        machine.set_initial(Gather::Collecting).unwrap();

        let producers: Vec<_> = (0..4u8)
            .map(|pos| {
                let events = Arc::clone(&events);
                thread::spawn(move || events.post(EventMask::bit(pos)))
            })
            .collect();

        assert_eq!(machine.run().unwrap(), 0);
        assert_eq!(machine.context().seen, WANTED);

        for producer in producers {
            producer.join().expect("producer panicked");
        }
    }
}
