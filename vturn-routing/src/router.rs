// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The forwarding engine owned by every switch.
//!
//! A [`SwitchRouter`] decides the output port for each packet that arrives at
//! its switch. When the canonical port cannot be used it falls back to a
//! recovery decision that depends on the level of the switch, the phase of
//! the packet and the configured [`TopologyVariant`] and [`ReroutePolicy`].
//!
//! Recovery decisions that choose a new path are remembered in the switch's
//! [`RerouteCache`] so that the rest of the flow follows the first packet.

use std::fmt;
use std::rc::Rc;

use vturn_engine::sim_error;
use vturn_engine::types::{SimError, SimResult};
use vturn_track::entity::Entity;
use vturn_track::{debug, trace, warn};

use crate::cache::{CachedRoute, RerouteCache, RouteKey};
use crate::config::{ReroutePolicy, RoutingConfig, TopologyVariant};
use crate::failure::FailureTable;
use crate::forwarding::{
    can_reach_destination, find_recovery_port, is_forwarding_phase, normal_forwarding_port,
};
use crate::label::{AGGREGATION_LEVEL, CORE_LEVEL, EDGE_LEVEL, PositionLabel};
use crate::tags::PacketTags;

/// How a forwarding decision was reached.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DecisionKind {
    /// The canonical port.
    Normal,

    /// A detour remembered from an earlier packet of the same flow.
    Cached,

    /// A newly computed detour.
    Recovery,

    /// Sent back towards the source.
    Backtrack,

    /// Sent back out of the port it arrived on.
    Bounce,
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecisionKind::Normal => "normal",
            DecisionKind::Cached => "cached",
            DecisionKind::Recovery => "recovery",
            DecisionKind::Backtrack => "backtrack",
            DecisionKind::Bounce => "bounce",
        };
        write!(f, "{name}")
    }
}

/// The output port chosen for one packet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Decision {
    pub port: usize,
    pub kind: DecisionKind,
}

impl Decision {
    fn new(port: usize, kind: DecisionKind) -> Self {
        Self { port, kind }
    }
}

/// Counts of the decisions made by one switch.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ForwardingStats {
    pub normal: u64,
    pub cached: u64,
    pub recovery: u64,
    pub backtracked: u64,
    pub bounced: u64,
}

impl ForwardingStats {
    fn record(&mut self, kind: DecisionKind) {
        match kind {
            DecisionKind::Normal => self.normal += 1,
            DecisionKind::Cached => self.cached += 1,
            DecisionKind::Recovery => self.recovery += 1,
            DecisionKind::Backtrack => self.backtracked += 1,
            DecisionKind::Bounce => self.bounced += 1,
        }
    }

    /// Number of times the recovery logic had to run.
    #[must_use]
    pub fn recovery_computations(&self) -> u64 {
        self.recovery + self.backtracked + self.bounced
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.normal + self.cached + self.recovery_computations()
    }

    pub fn accumulate(&mut self, other: &ForwardingStats) {
        self.normal += other.normal;
        self.cached += other.cached;
        self.recovery += other.recovery;
        self.backtracked += other.backtracked;
        self.bounced += other.bounced;
    }
}

/// The forwarding state of one switch.
pub struct SwitchRouter {
    entity: Rc<Entity>,
    label: PositionLabel,
    config: Rc<RoutingConfig>,
    failures: Rc<FailureTable>,
    cache: RerouteCache,
    stats: ForwardingStats,
}

impl SwitchRouter {
    /// Create the router for the switch with the given label.
    pub fn new(
        parent: &Rc<Entity>,
        label: PositionLabel,
        config: &Rc<RoutingConfig>,
        failures: &Rc<FailureTable>,
    ) -> Result<Self, SimError> {
        if !label.is_switch_level() {
            return sim_error!(format!("Cannot create a router for {label}, it is not a switch"));
        }
        Ok(Self {
            entity: Rc::new(Entity::new(parent, "router")),
            label,
            config: config.clone(),
            failures: failures.clone(),
            cache: RerouteCache::new(),
            stats: ForwardingStats::default(),
        })
    }

    #[must_use]
    pub fn label(&self) -> PositionLabel {
        self.label
    }

    #[must_use]
    pub fn stats(&self) -> ForwardingStats {
        self.stats
    }

    #[must_use]
    pub fn cache(&self) -> &RerouteCache {
        &self.cache
    }

    pub fn clear_cache(&mut self) {
        if !self.cache.is_empty() {
            debug!(self.entity ; "{}: clear {} cached routes", self.label, self.cache.len());
        }
        self.cache.clear();
    }

    /// Whether the link on `port` of this switch is up.
    #[must_use]
    pub fn is_link_up(&self, port: usize) -> bool {
        self.failures.is_link_up(&self.label, port)
    }

    /// Choose the output port for a packet that arrived on `input_port`.
    ///
    /// May rewrite the packet's turning switch and mark it as revised. A
    /// decision that would send a forwarding packet back out of its input
    /// port without being a bounce is an error.
    pub fn forward(&mut self, tags: &mut PacketTags, input_port: usize) -> Result<Decision, SimError> {
        self.config.check_port(input_port)?;

        if let Some(route) = self.cache.get(&RouteKey::from_tags(tags)) {
            if let Some(turning) = route.turning {
                tags.set_turning(turning);
            }
            tags.mark_revised();
            self.stats.record(DecisionKind::Cached);
            trace!(self.entity ; "{}: {} cached port {}", self.label, tags, route.port);
            return Ok(Decision::new(route.port, DecisionKind::Cached));
        }

        let forwarding = is_forwarding_phase(&self.config, &self.label, &tags.dst, input_port)?;
        let decision = if forwarding {
            let port = normal_forwarding_port(
                &self.config,
                &self.label,
                &tags.dst,
                &tags.turning,
                input_port,
            )?;
            if self.is_link_up(port)
                && (!self.config.is_down_port(self.label.level, port)
                    || can_reach_destination(&self.label, &tags.dst))
            {
                Decision::new(port, DecisionKind::Normal)
            } else {
                self.recover_forwarding(tags, input_port, port)?
            }
        } else {
            self.recover_backtracking(tags, input_port)?
        };

        if forwarding && decision.kind != DecisionKind::Bounce && decision.port == input_port {
            return sim_error!(format!(
                "{}: {} would be forwarded back out of input port {input_port}",
                self.label, tags
            ));
        }

        self.stats.record(decision.kind);
        trace!(self.entity ; "{}: {} in {} out {} ({})", self.label, tags, input_port, decision.port, decision.kind);
        Ok(decision)
    }

    /// The canonical port of a forwarding packet is down or cannot reach the
    /// destination.
    fn recover_forwarding(
        &mut self,
        tags: &mut PacketTags,
        input_port: usize,
        canonical: usize,
    ) -> Result<Decision, SimError> {
        let down = self.config.is_down_port(self.label.level, canonical);
        match self.label.level {
            CORE_LEVEL => Ok(self.bounce(tags, input_port)),
            AGGREGATION_LEVEL if down => {
                if self.label.pod != tags.dst.pod {
                    return sim_error!(format!(
                        "{}: {} is descending in the wrong pod",
                        self.label, tags
                    ));
                }
                match self.config.policy() {
                    ReroutePolicy::LocalVTurn => {
                        let port = self.recovery_port_from(canonical)?;
                        self.cache_detour(tags, port, None);
                        Ok(Decision::new(port, DecisionKind::Recovery))
                    }
                    ReroutePolicy::BacktrackOnly => Ok(self.bounce(tags, input_port)),
                }
            }
            AGGREGATION_LEVEL => {
                if self.label.pod != tags.src.pod {
                    return sim_error!(format!(
                        "{}: {} is ascending outside its source pod",
                        self.label, tags
                    ));
                }
                self.core_detour(tags, canonical)
            }
            EDGE_LEVEL if down => {
                if self.label.pod != tags.dst.pod {
                    return sim_error!(format!(
                        "{}: {} is descending in the wrong pod",
                        self.label, tags
                    ));
                }
                let may_turn = match self.config.policy() {
                    ReroutePolicy::LocalVTurn => true,
                    ReroutePolicy::BacktrackOnly => self.label == tags.src.edge_of_server(),
                };
                if !may_turn {
                    return Ok(self.bounce(tags, input_port));
                }
                if self.config.is_down_port(EDGE_LEVEL, input_port) {
                    return sim_error!(format!(
                        "{}: {} arrived from a server but cannot reach its destination",
                        self.label, tags
                    ));
                }
                self.aggregation_detour(tags, input_port)
            }
            EDGE_LEVEL => self.aggregation_detour(tags, canonical),
            level => sim_error!(format!("Switch {} has invalid level {level}", self.label)),
        }
    }

    /// The packet has reached a dead end and is heading back.
    fn recover_backtracking(
        &mut self,
        tags: &mut PacketTags,
        input_port: usize,
    ) -> Result<Decision, SimError> {
        match self.label.level {
            CORE_LEVEL => {
                let port = tags.src.pod + 1;
                self.config.check_port(port)?;
                if self.is_link_up(port) {
                    Ok(self.backtrack(tags, port))
                } else {
                    Ok(self.bounce(tags, input_port))
                }
            }
            AGGREGATION_LEVEL => {
                if self.label.pod != tags.src.pod {
                    return sim_error!(format!(
                        "{}: {} cannot reach destination pod {}",
                        self.label, tags, tags.dst.pod
                    ));
                }
                match self.config.topology() {
                    TopologyVariant::Efficient => self.core_detour(tags, input_port),
                    TopologyVariant::Regular => {
                        let port = tags.src.switch_idx + 1;
                        self.config.check_port(port)?;
                        if self.is_link_up(port) {
                            Ok(self.backtrack(tags, port))
                        } else {
                            self.core_detour(tags, input_port)
                        }
                    }
                }
            }
            EDGE_LEVEL => self.aggregation_detour(tags, input_port),
            level => sim_error!(format!("Switch {} has invalid level {level}", self.label)),
        }
    }

    /// Aggregation switch: go up to a different core switch, which becomes
    /// the new turning switch.
    fn core_detour(&mut self, tags: &mut PacketTags, start: usize) -> Result<Decision, SimError> {
        let port = self.recovery_port_from(start)?;
        let group = port - self.config.half_ports() - 1;
        let turning = self
            .config
            .core_above(self.label.pod, self.label.switch_idx, group);
        self.cache_detour(tags, port, Some(turning));
        Ok(Decision::new(port, DecisionKind::Recovery))
    }

    /// Edge switch: go up to a different aggregation switch.
    fn aggregation_detour(
        &mut self,
        tags: &mut PacketTags,
        start: usize,
    ) -> Result<Decision, SimError> {
        let port = self.recovery_port_from(start)?;
        let agg = port - self.config.half_ports() - 1;
        let turning = match tags.turning.level {
            CORE_LEVEL if self.label.pod != tags.dst.pod => {
                self.config.core_above(self.label.pod, agg, tags.turning.pod)
            }
            CORE_LEVEL | AGGREGATION_LEVEL => PositionLabel::aggregation(self.label.pod, agg),
            _ => {
                return sim_error!(format!(
                    "{}: {} has no turning switch above this edge switch",
                    self.label, tags
                ));
            }
        };
        self.cache_detour(tags, port, Some(turning));
        Ok(Decision::new(port, DecisionKind::Recovery))
    }

    /// Apply [`find_recovery_port`] until a live port is found.
    fn recovery_port_from(&self, start: usize) -> Result<usize, SimError> {
        let mut port = start;
        loop {
            port = find_recovery_port(&self.config, port)?;
            if port == start {
                return sim_error!(format!(
                    "{}: no live port to recover from port {start}",
                    self.label
                ));
            }
            if self.is_link_up(port) {
                return Ok(port);
            }
        }
    }

    fn cache_detour(&mut self, tags: &mut PacketTags, port: usize, turning: Option<PositionLabel>) {
        let key = RouteKey::from_tags(tags);
        self.cache.insert(key, CachedRoute { port, turning });
        if let Some(turning) = turning {
            tags.set_turning(turning);
        }
        tags.mark_revised();
        debug!(self.entity ; "{}: detour {} -> {} via port {port}", self.label, key.dst, key.turning);
    }

    fn backtrack(&self, tags: &mut PacketTags, port: usize) -> Decision {
        tags.mark_revised();
        debug!(self.entity ; "{}: backtrack {} on port {port}", self.label, tags);
        Decision::new(port, DecisionKind::Backtrack)
    }

    fn bounce(&self, tags: &mut PacketTags, input_port: usize) -> Decision {
        tags.mark_revised();
        warn!(self.entity ; "{}: bounce {} back out of port {input_port}", self.label, tags);
        Decision::new(input_port, DecisionKind::Bounce)
    }
}

/// Remove every failure and forget every detour.
pub fn clear_failure<'a>(
    failures: &FailureTable,
    routers: impl IntoIterator<Item = &'a mut SwitchRouter>,
) -> SimResult {
    failures.clear();
    for router in routers {
        router.clear_cache();
    }
    Ok(())
}
