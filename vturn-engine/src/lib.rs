// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

#![doc(test(attr(warn(unused))))]

//! The discrete-event engine for the V-turn fat-tree simulator.
//!
//! The [engine](crate::engine::Engine) keeps a time-ordered queue of events of
//! a model-defined type. Each event is passed to a
//! [handler](crate::traits::Handler) which owns all of the model state and can
//! schedule further events.
//!
//! # Simple Application
//!
//! ```rust
//! use vturn_engine::engine::Engine;
//! use vturn_engine::run_simulation;
//! use vturn_engine::traits::Handler;
//! use vturn_engine::types::SimResult;
//!
//! struct Counter(usize);
//!
//! impl Handler<usize> for Counter {
//!     fn handle(&mut self, engine: &mut Engine<usize>, event: usize) -> SimResult {
//!         self.0 += 1;
//!         if event > 0 {
//!             engine.schedule_in(10, event - 1);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let mut engine = Engine::default();
//! let mut counter = Counter(0);
//! engine.schedule_in(0, 3);
//! run_simulation!(engine, counter);
//! assert_eq!(counter.0, 4);
//! assert_eq!(engine.time_now_ns(), 30);
//! ```

pub mod engine;
pub mod test_helpers;
pub mod traits;
pub mod types;

#[macro_export]
/// Run the simulation to completion.
///
/// The second form expects the simulation to fail with the given error
/// message.
macro_rules! run_simulation {
    ($engine:ident, $handler:ident) => {
        $engine.run(&mut $handler).unwrap();
    };
    ($engine:ident, $handler:ident, $expect:expr) => {
        match $engine.run(&mut $handler) {
            Ok(()) => panic!("Expected an error!"),
            Err(e) => assert_eq!(format!("{e}").as_str(), $expect),
        }
    };
}
