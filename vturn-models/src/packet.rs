// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Simulated packets.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use vturn_routing::tags::PacketTags;
use vturn_track::entity::Entity;
use vturn_track::id::Unique;
use vturn_track::{Id, create, create_id};

/// Default number of switch hops a packet may take before it is dropped.
pub const DEFAULT_TTL: u32 = 64;

/// Transport carried by a packet.
///
/// Only TCP and UDP traffic is self-routed through the fat-tree. Anything
/// else is handed to the default handler of the first node that receives it.
#[derive(clap::ValueEnum, Clone, Copy, Default, Debug, Serialize, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    #[default]
    Udp,
    Tcp,
    Other,
}

impl Protocol {
    #[must_use]
    pub fn is_routed(&self) -> bool {
        matches!(self, Protocol::Udp | Protocol::Tcp)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Udp => write!(f, "udp"),
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Other => write!(f, "other"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Packet {
    pub id: Id,
    pub tags: PacketTags,
    pub flow: usize,
    pub seq: u64,
    pub bytes: usize,
    pub protocol: Protocol,
    pub created_ns: u64,

    /// Switch hops taken so far.
    pub hops: u32,

    /// Switch hops left before the packet is dropped.
    pub ttl: u32,
}

impl Packet {
    /// Create a packet and record its creation against `created_by`.
    #[must_use]
    pub fn new(
        created_by: &Rc<Entity>,
        tags: PacketTags,
        flow: usize,
        seq: u64,
        bytes: usize,
        protocol: Protocol,
        created_ns: u64,
    ) -> Self {
        let packet = Self {
            id: create_id!(created_by),
            tags,
            flow,
            seq,
            bytes,
            protocol,
            created_ns,
            hops: 0,
            ttl: DEFAULT_TTL,
        };
        create!(created_by ; packet, bytes);
        packet
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} flow {} #{} {} ({} bytes)",
            self.protocol, self.flow, self.seq, self.tags, self.bytes
        )
    }
}

impl Unique for Packet {
    fn id(&self) -> Id {
        self.id
    }
}
