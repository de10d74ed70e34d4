// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The k-ary fat-tree topology.
//!
//! With `k` ports per switch and `h = k / 2` the tree has:
//!  - `k` pods, each with `h` aggregation switches `(pod, a, 1)` and `h` edge
//!    switches `(pod, e, 2)`,
//!  - `h * h` core switches `(c, s, 0)`,
//!  - `h` servers `(pod, e, host)` below every edge switch.
//!
//! Port `h + 1 + a` of edge switch `(p, e, 2)` leads to port `e + 1` of
//! aggregation switch `(p, a, 1)`. Port `h + 1 + c` of aggregation switch
//! `(p, s, 1)` leads to port `p + 1` of a core switch in group `c`: switch
//! `(c, s, 0)` in the regular tree, or the pod's shuffle of it in the
//! efficient tree. Port `q` of an edge switch leads to server `q - 1` below
//! it. Servers have one port.

use std::fmt;

use itertools::iproduct;
use vturn_engine::types::SimError;
use vturn_routing::config::{ReroutePolicy, RoutingConfig, TopologyVariant};
use vturn_routing::label::PositionLabel;

use crate::packet::DEFAULT_TTL;
use crate::queue::QueueMode;

pub const DEFAULT_DATA_RATE_GBPS: f64 = 1.0;
pub const DEFAULT_DELAY_NS: u64 = 1000;

/// Switches and servers can share a label, so nodes are named by both.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum NodeId {
    Switch(PositionLabel),
    Server(PositionLabel),
}

impl NodeId {
    #[must_use]
    pub fn label(&self) -> PositionLabel {
        match self {
            NodeId::Switch(label) | NodeId::Server(label) => *label,
        }
    }

    /// A short name that can be used as an entity name.
    #[must_use]
    pub fn entity_name(&self) -> String {
        let label = self.label();
        match self {
            NodeId::Server(_) => format!("server_{}_{}_{}", label.pod, label.switch_idx, label.level),
            NodeId::Switch(_) => {
                let kind = match label.level {
                    0 => "core",
                    1 => "agg",
                    _ => "edge",
                };
                format!("{kind}_{}_{}", label.pod, label.switch_idx)
            }
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Switch(label) => write!(f, "switch {label}"),
            NodeId::Server(label) => write!(f, "server {label}"),
        }
    }
}

/// One end of a link.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Endpoint {
    pub node: NodeId,
    pub port: usize,
}

/// A bi-directional link.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Link {
    pub a: Endpoint,
    pub b: Endpoint,
}

impl Link {
    fn new(a: NodeId, a_port: usize, b: NodeId, b_port: usize) -> Self {
        Self {
            a: Endpoint { node: a, port: a_port },
            b: Endpoint { node: b, port: b_port },
        }
    }
}

/// Everything needed to build a fat-tree network.
#[derive(Clone, Debug)]
pub struct FatTreeConfig {
    routing: RoutingConfig,
    data_rate_gbps: f64,
    delay_ns: u64,
    queue_mode: QueueMode,
    queue_limit: Option<usize>,
    ttl: u32,
}

impl FatTreeConfig {
    /// Create a config with default link and queue parameters.
    pub fn new(
        port_count: usize,
        topology: TopologyVariant,
        policy: ReroutePolicy,
    ) -> Result<Self, SimError> {
        Ok(Self {
            routing: RoutingConfig::new(port_count, topology, policy)?,
            data_rate_gbps: DEFAULT_DATA_RATE_GBPS,
            delay_ns: DEFAULT_DELAY_NS,
            queue_mode: QueueMode::default(),
            queue_limit: None,
            ttl: DEFAULT_TTL,
        })
    }

    pub fn set_link(mut self, data_rate_gbps: f64, delay_ns: u64) -> Result<Self, SimError> {
        if data_rate_gbps <= 0.0 {
            return Err(SimError(format!(
                "Data rate must be positive, got {data_rate_gbps}Gbps"
            )));
        }
        self.data_rate_gbps = data_rate_gbps;
        self.delay_ns = delay_ns;
        Ok(self)
    }

    #[must_use]
    pub fn set_queue(mut self, mode: QueueMode, limit: Option<usize>) -> Self {
        self.queue_mode = mode;
        self.queue_limit = limit;
        self
    }

    #[must_use]
    pub fn set_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn routing(&self) -> &RoutingConfig {
        &self.routing
    }

    #[must_use]
    pub fn port_count(&self) -> usize {
        self.routing.port_count()
    }

    #[must_use]
    pub fn half_ports(&self) -> usize {
        self.routing.half_ports()
    }

    #[must_use]
    pub fn num_pods(&self) -> usize {
        self.port_count()
    }

    #[must_use]
    pub fn num_core(&self) -> usize {
        self.half_ports() * self.half_ports()
    }

    #[must_use]
    pub fn num_switches(&self) -> usize {
        self.num_core() + 2 * self.num_pods() * self.half_ports()
    }

    #[must_use]
    pub fn num_servers(&self) -> usize {
        self.num_pods() * self.half_ports() * self.half_ports()
    }

    #[must_use]
    pub fn data_rate_gbps(&self) -> f64 {
        self.data_rate_gbps
    }

    #[must_use]
    pub fn delay_ns(&self) -> u64 {
        self.delay_ns
    }

    #[must_use]
    pub fn queue_mode(&self) -> QueueMode {
        self.queue_mode
    }

    #[must_use]
    pub fn queue_limit(&self) -> Option<usize> {
        self.queue_limit
    }

    #[must_use]
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    /// All switch labels: core first, then aggregation and edge by pod.
    #[must_use]
    pub fn switches(&self) -> Vec<PositionLabel> {
        let h = self.half_ports();
        let core = iproduct!(0..h, 0..h).map(|(c, s)| PositionLabel::core(c, s));
        let aggregation =
            iproduct!(0..self.num_pods(), 0..h).map(|(p, a)| PositionLabel::aggregation(p, a));
        let edge = iproduct!(0..self.num_pods(), 0..h).map(|(p, e)| PositionLabel::edge(p, e));
        core.chain(aggregation).chain(edge).collect()
    }

    #[must_use]
    pub fn servers(&self) -> Vec<PositionLabel> {
        let h = self.half_ports();
        iproduct!(0..self.num_pods(), 0..h, 0..h)
            .map(|(p, e, host)| PositionLabel::server(p, e, host))
            .collect()
    }

    /// Whether `label` names a server of this tree.
    #[must_use]
    pub fn is_server(&self, label: &PositionLabel) -> bool {
        label.pod < self.num_pods()
            && label.switch_idx < self.half_ports()
            && label.level < self.half_ports()
    }

    /// Whether `label` names a switch of this tree.
    #[must_use]
    pub fn is_switch(&self, label: &PositionLabel) -> bool {
        let h = self.half_ports();
        match label.level {
            0 => label.pod < h && label.switch_idx < h,
            1 | 2 => label.pod < self.num_pods() && label.switch_idx < h,
            _ => false,
        }
    }

    /// Every link in the tree.
    #[must_use]
    pub fn links(&self) -> Vec<Link> {
        let h = self.half_ports();
        let pods = self.num_pods();

        let servers = iproduct!(0..pods, 0..h, 0..h).map(|(p, e, host)| {
            Link::new(
                NodeId::Switch(PositionLabel::edge(p, e)),
                host + 1,
                NodeId::Server(PositionLabel::server(p, e, host)),
                1,
            )
        });
        let edge_up = iproduct!(0..pods, 0..h, 0..h).map(|(p, e, a)| {
            Link::new(
                NodeId::Switch(PositionLabel::edge(p, e)),
                h + 1 + a,
                NodeId::Switch(PositionLabel::aggregation(p, a)),
                e + 1,
            )
        });
        let aggregation_up = iproduct!(0..pods, 0..h, 0..h).map(|(p, s, c)| {
            Link::new(
                NodeId::Switch(PositionLabel::aggregation(p, s)),
                h + 1 + c,
                NodeId::Switch(self.routing.core_above(p, s, c)),
                p + 1,
            )
        });
        servers.chain(edge_up).chain(aggregation_up).collect()
    }
}

impl Default for FatTreeConfig {
    fn default() -> Self {
        Self {
            routing: RoutingConfig::default(),
            data_rate_gbps: DEFAULT_DATA_RATE_GBPS,
            delay_ns: DEFAULT_DELAY_NS,
            queue_mode: QueueMode::default(),
            queue_limit: None,
            ttl: DEFAULT_TTL,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn sizes() {
        let config = FatTreeConfig::default();
        assert_eq!(config.num_pods(), 8);
        assert_eq!(config.num_core(), 16);
        assert_eq!(config.num_switches(), 80);
        assert_eq!(config.num_servers(), 128);
        assert_eq!(config.switches().len(), config.num_switches());
        assert_eq!(config.servers().len(), config.num_servers());
        assert_eq!(config.links().len(), 128 + 128 + 128);
    }

    #[test]
    fn every_port_used_once() {
        for (port_count, topology) in
            iproduct!([4, 6, 8], [TopologyVariant::Regular, TopologyVariant::Efficient])
        {
            let config = FatTreeConfig::new(port_count, topology, ReroutePolicy::LocalVTurn).unwrap();
            let mut seen = HashSet::new();
            for link in config.links() {
                assert!(seen.insert((link.a.node, link.a.port)));
                assert!(seen.insert((link.b.node, link.b.port)));
            }
            for switch in config.switches() {
                for port in 1..=port_count {
                    assert!(seen.contains(&(NodeId::Switch(switch), port)), "{switch}:{port}");
                }
            }
            for server in config.servers() {
                assert!(seen.contains(&(NodeId::Server(server), 1)));
            }
        }
    }

    fn peer(links: &[Link], node: NodeId, port: usize) -> Endpoint {
        links
            .iter()
            .find_map(|l| {
                if l.a.node == node && l.a.port == port {
                    Some(l.b)
                } else if l.b.node == node && l.b.port == port {
                    Some(l.a)
                } else {
                    None
                }
            })
            .unwrap()
    }

    #[test]
    fn wiring() {
        let config = FatTreeConfig::default();
        let links = config.links();
        let find = |node: NodeId, port: usize| peer(&links, node, port);

        let peer = find(NodeId::Switch(PositionLabel::edge(2, 1)), 7);
        assert_eq!(peer.node, NodeId::Switch(PositionLabel::aggregation(2, 2)));
        assert_eq!(peer.port, 2);

        let peer = find(NodeId::Switch(PositionLabel::aggregation(3, 1)), 8);
        assert_eq!(peer.node, NodeId::Switch(PositionLabel::core(3, 1)));
        assert_eq!(peer.port, 4);

        let peer = find(NodeId::Switch(PositionLabel::core(0, 2)), 6);
        assert_eq!(peer.node, NodeId::Switch(PositionLabel::aggregation(5, 2)));
        assert_eq!(peer.port, 5);
    }

    #[test]
    fn efficient_wiring_is_shuffled() {
        let regular = FatTreeConfig::default();
        let efficient =
            FatTreeConfig::new(8, TopologyVariant::Efficient, ReroutePolicy::BacktrackOnly).unwrap();
        assert_ne!(regular.links(), efficient.links());

        let links = efficient.links();
        let agg = |p, a| NodeId::Switch(PositionLabel::aggregation(p, a));

        // Pod 0 keeps the regular wiring
        let up = peer(&links, agg(0, 0), 6);
        assert_eq!(up.node, NodeId::Switch(PositionLabel::core(1, 0)));

        // Core (1, 0) leads to a different aggregation switch in pod 1
        let down = peer(&links, NodeId::Switch(PositionLabel::core(1, 0)), 2);
        assert_eq!(down.node, agg(1, 3));
        assert_eq!(down.port, 6);
    }

    #[test]
    fn membership() {
        let config = FatTreeConfig::default();
        assert!(config.is_switch(&PositionLabel::core(3, 3)));
        assert!(!config.is_switch(&PositionLabel::core(4, 0)));
        assert!(config.is_switch(&PositionLabel::edge(7, 3)));
        assert!(!config.is_switch(&PositionLabel::new(0, 0, 3)));
        assert!(config.is_server(&PositionLabel::server(7, 3, 3)));
        assert!(!config.is_server(&PositionLabel::server(8, 0, 0)));
    }

    #[test]
    fn bad_link() {
        assert!(FatTreeConfig::default().set_link(0.0, 10).is_err());
    }

    #[test]
    fn entity_names() {
        assert_eq!(NodeId::Switch(PositionLabel::core(1, 2)).entity_name(), "core_1_2");
        assert_eq!(NodeId::Server(PositionLabel::server(1, 2, 3)).entity_name(), "server_1_2_3");
    }
}
