// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Identifiers attached to every tracked switch, device and packet.

use std::cell::Cell;
use std::fmt;

/// Simulation-wide identifier.
///
/// Two values are reserved: [`NO_ID`](crate::NO_ID) is used as the creator of
/// the top-level entity and [`ROOT`](crate::ROOT) is never handed out by an
/// [`IdCounter`].
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Id(pub u64);

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Objects that are tracked by [`Id`] rather than by owning an entity.
pub trait Unique {
    /// The identifier used in trace events for this object.
    fn id(&self) -> Id;
}

/// Hands out increasing [`Id`]s.
#[derive(Debug)]
pub struct IdCounter {
    next: Cell<u64>,
}

impl IdCounter {
    /// The first call to [`next_id`](Self::next_id) returns `Id(first)`.
    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: Cell::new(first),
        }
    }

    /// Allocate the next identifier.
    pub fn next_id(&self) -> Id {
        let id = self.next.get();
        self.next.set(id + 1);
        Id(id)
    }
}

impl Default for IdCounter {
    fn default() -> Self {
        Self::starting_at(crate::ROOT.0 + 1)
    }
}
