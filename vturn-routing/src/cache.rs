// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The per-switch cache of detour decisions.

use std::collections::HashMap;

use crate::label::PositionLabel;
use crate::tags::PacketTags;

/// Flows are identified by where they are going and where they turn.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RouteKey {
    pub dst: PositionLabel,
    pub turning: PositionLabel,
}

impl RouteKey {
    #[must_use]
    pub fn new(dst: PositionLabel, turning: PositionLabel) -> Self {
        Self { dst, turning }
    }

    #[must_use]
    pub fn from_tags(tags: &PacketTags) -> Self {
        Self::new(tags.dst, tags.turning)
    }
}

/// A remembered recovery decision.
///
/// Every packet that takes a cached route is marked as revised, including
/// routes that leave the turning switch unchanged. The revised count is
/// therefore the number of packets that left the canonical path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CachedRoute {
    /// Output port chosen when the detour was computed.
    pub port: usize,

    /// The turning switch stamped on packets that take the detour, if the
    /// detour changed it.
    pub turning: Option<PositionLabel>,
}

/// Remembers the first recovery decision made for each flow.
///
/// An entry is never replaced. Once a flow has been given a detour every
/// later packet of that flow takes it until the cache is cleared, so packets
/// of one flow are not reordered across different paths.
#[derive(Default)]
pub struct RerouteCache {
    routes: HashMap<RouteKey, CachedRoute>,
}

impl RerouteCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &RouteKey) -> Option<CachedRoute> {
        self.routes.get(key).copied()
    }

    /// Record a decision. Returns `false` (and keeps the existing entry) if
    /// the flow already has one.
    pub fn insert(&mut self, key: RouteKey, route: CachedRoute) -> bool {
        if self.routes.contains_key(&key) {
            return false;
        }
        self.routes.insert(key, route);
        true
    }

    pub fn clear(&mut self) {
        self.routes.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
