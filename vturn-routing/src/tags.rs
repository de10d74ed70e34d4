// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Routing metadata carried by every packet.

use std::fmt;

use crate::label::PositionLabel;

/// The identity tags attached to a packet when it leaves its source server.
///
/// `turning` starts as the switch at which the path should stop ascending.
/// It is only rewritten by a switch that reroutes the packet around a
/// failure. `revised` records that the packet has been rerouted at least
/// once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketTags {
    pub src: PositionLabel,
    pub dst: PositionLabel,
    pub turning: PositionLabel,
    pub revised: bool,
}

impl PacketTags {
    #[must_use]
    pub fn new(src: PositionLabel, dst: PositionLabel, turning: PositionLabel) -> Self {
        Self {
            src,
            dst,
            turning,
            revised: false,
        }
    }

    /// Replace the turning switch after a detour.
    pub fn set_turning(&mut self, turning: PositionLabel) {
        self.turning = turning;
    }

    pub fn mark_revised(&mut self) {
        self.revised = true;
    }
}

impl fmt::Display for PacketTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} via {}{}",
            self.src,
            self.dst,
            self.turning,
            if self.revised { " (revised)" } else { "" }
        )
    }
}
