// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A set of common traits used across the V-turn engine and models.

use crate::engine::Engine;
use crate::types::SimResult;

/// Implemented by the model that owns the simulation state and reacts to the
/// events of type `E` popped from the [`Engine`].
///
/// The engine is passed back in so that the handler can schedule follow-on
/// events.
pub trait Handler<E> {
    /// Process one event at the current simulation time.
    fn handle(&mut self, engine: &mut Engine<E>, event: E) -> SimResult;
}
