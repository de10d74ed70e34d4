// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use vturn_engine::engine::Engine;
use vturn_engine::test_helpers::start_test;
use vturn_engine::traits::Handler;
use vturn_engine::types::SimResult;
use vturn_engine::{run_simulation, sim_error};

enum Event {
    Tick(u32),
    Fail,
}

#[derive(Default)]
struct Ticker {
    ticks: u32,
}

impl Handler<Event> for Ticker {
    fn handle(&mut self, engine: &mut Engine<Event>, event: Event) -> SimResult {
        match event {
            Event::Tick(remaining) => {
                self.ticks += 1;
                if remaining > 0 {
                    engine.schedule_in(100, Event::Tick(remaining - 1));
                }
                Ok(())
            }
            Event::Fail => sim_error!(format!("failed after {} ticks", self.ticks)),
        }
    }
}

#[test]
fn ticks_to_completion() {
    let mut engine = start_test(file!());
    let mut ticker = Ticker::default();
    engine.schedule_in(0, Event::Tick(9));

    run_simulation!(engine, ticker);
    assert_eq!(ticker.ticks, 10);
    approx::assert_relative_eq!(engine.time_now_ns() as f64, 900.0);
}

#[test]
fn error_stops_the_run() {
    let mut engine = start_test(file!());
    let mut ticker = Ticker::default();
    engine.schedule_in(0, Event::Tick(9));
    engine.schedule_at(250, Event::Fail).unwrap();

    run_simulation!(engine, ticker, "Error: failed after 3 ticks");
    assert_eq!(engine.time_now_ns(), 250);
    assert_eq!(engine.num_pending(), 1);
}
