// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A tail-drop transmit queue.
//!
//! The queue is limited either by the number of packets it holds or by the
//! number of bytes. A packet that does not fit is dropped and counted against
//! its source.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};
use vturn_routing::label::PositionLabel;

use crate::packet::Packet;

/// Default limit of a queue in [`QueueMode::Packets`] mode.
pub const DEFAULT_MAX_PACKETS: usize = 100;

/// Default limit of a queue in [`QueueMode::Bytes`] mode.
pub const DEFAULT_MAX_BYTES: usize = 100 * 65535;

#[derive(clap::ValueEnum, Clone, Copy, Default, Debug, Serialize, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueMode {
    #[default]
    Packets,
    Bytes,
}

impl fmt::Display for QueueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueMode::Packets => write!(f, "packets"),
            QueueMode::Bytes => write!(f, "bytes"),
        }
    }
}

/// Counters kept by a [`DropTailQueue`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueStats {
    pub enqueued: u64,
    pub dequeued: u64,
    pub dropped: u64,

    /// Packets already rerouted around a failure when they were enqueued.
    pub revised_enqueued: u64,

    /// Packets already rerouted around a failure when they were dropped.
    pub revised_dropped: u64,

    /// Drops by the source server of the packet.
    pub dropped_by_source: HashMap<PositionLabel, u64>,
}

impl QueueStats {
    pub fn accumulate(&mut self, other: &QueueStats) {
        self.enqueued += other.enqueued;
        self.dequeued += other.dequeued;
        self.dropped += other.dropped;
        self.revised_enqueued += other.revised_enqueued;
        self.revised_dropped += other.revised_dropped;
        for (src, count) in &other.dropped_by_source {
            *self.dropped_by_source.entry(*src).or_default() += count;
        }
    }
}

pub struct DropTailQueue {
    mode: QueueMode,
    limit: usize,
    packets: VecDeque<Packet>,
    num_bytes: usize,
    stats: QueueStats,
}

impl DropTailQueue {
    /// Create a queue. A `limit` of `None` uses the default for the mode.
    #[must_use]
    pub fn new(mode: QueueMode, limit: Option<usize>) -> Self {
        let limit = limit.unwrap_or(match mode {
            QueueMode::Packets => DEFAULT_MAX_PACKETS,
            QueueMode::Bytes => DEFAULT_MAX_BYTES,
        });
        Self {
            mode,
            limit,
            packets: VecDeque::new(),
            num_bytes: 0,
            stats: QueueStats::default(),
        }
    }

    /// Add a packet to the tail of the queue.
    ///
    /// Returns the packet back if there is no room for it.
    pub fn enqueue(&mut self, packet: Packet) -> Result<(), Packet> {
        let fits = match self.mode {
            QueueMode::Packets => self.packets.len() < self.limit,
            QueueMode::Bytes => self.num_bytes + packet.bytes <= self.limit,
        };
        if !fits {
            self.stats.dropped += 1;
            if packet.tags.revised {
                self.stats.revised_dropped += 1;
            }
            *self
                .stats
                .dropped_by_source
                .entry(packet.tags.src)
                .or_default() += 1;
            return Err(packet);
        }

        self.stats.enqueued += 1;
        if packet.tags.revised {
            self.stats.revised_enqueued += 1;
        }
        self.num_bytes += packet.bytes;
        self.packets.push_back(packet);
        Ok(())
    }

    pub fn dequeue(&mut self) -> Option<Packet> {
        let packet = self.packets.pop_front()?;
        self.num_bytes -= packet.bytes;
        self.stats.dequeued += 1;
        Some(packet)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    #[must_use]
    pub fn num_bytes(&self) -> usize {
        self.num_bytes
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[must_use]
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}
