// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Configuration shared by every switch's forwarding engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use vturn_engine::sim_error;
use vturn_engine::types::{SimError, SimResult};

use crate::label::PositionLabel;

/// Smallest supported switch radix.
pub const MIN_PORT_COUNT: usize = 4;

/// Largest supported switch radix.
pub const MAX_PORT_COUNT: usize = 16;

/// How the core layer is wired to the aggregation layer.
///
/// In both variants up-port `h + 1 + c` of an aggregation switch leads to a
/// core switch in group `c`. The variants differ in which switch of that
/// group, see [`RoutingConfig::core_above`], and in what an aggregation
/// switch in the source pod does with a packet that has been sent back down
/// to it from the core.
#[derive(clap::ValueEnum, Clone, Copy, Default, Debug, Serialize, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopologyVariant {
    #[default]
    /// Core switch `(c, s)` is connected to aggregation switch `s` of every
    /// pod. A backtracked packet goes on to the source edge switch, which
    /// picks another aggregation switch.
    Regular,

    /// Each pod is connected to the core through its own shuffle, so two
    /// cores reached from one aggregation switch lead to different
    /// aggregation switches in most destination pods. The source pod's
    /// aggregation switch picks another core switch itself.
    Efficient,
}

/// What a switch in the destination pod does when it cannot make progress.
#[derive(clap::ValueEnum, Clone, Copy, Default, Debug, Serialize, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReroutePolicy {
    /// Send the packet back the way it came and let the source side pick a
    /// different path.
    BacktrackOnly,

    #[default]
    /// Detour locally through a sibling switch in the destination pod.
    LocalVTurn,
}

impl fmt::Display for TopologyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyVariant::Regular => write!(f, "regular"),
            TopologyVariant::Efficient => write!(f, "efficient"),
        }
    }
}

impl fmt::Display for ReroutePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReroutePolicy::BacktrackOnly => write!(f, "backtrack-only"),
            ReroutePolicy::LocalVTurn => write!(f, "local-v-turn"),
        }
    }
}

/// Switch radix and recovery behaviour.
///
/// Ports are numbered from 1. On aggregation and edge switches ports
/// `1..=half_ports()` lead down the tree and the rest lead up. All ports of
/// a core switch lead down.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutingConfig {
    /// Number of ports on every switch (the `k` of the k-ary fat-tree).
    port_count: usize,

    /// Core wiring variant.
    topology: TopologyVariant,

    /// Destination-pod recovery policy.
    policy: ReroutePolicy,
}

impl RoutingConfig {
    /// Create a config, checking that the radix is even and supported.
    pub fn new(
        port_count: usize,
        topology: TopologyVariant,
        policy: ReroutePolicy,
    ) -> Result<Self, SimError> {
        if port_count % 2 != 0 || !(MIN_PORT_COUNT..=MAX_PORT_COUNT).contains(&port_count) {
            return sim_error!(format!(
                "Port count {port_count} must be even and between {MIN_PORT_COUNT} and {MAX_PORT_COUNT}"
            ));
        }
        Ok(Self {
            port_count,
            topology,
            policy,
        })
    }

    #[must_use]
    pub fn port_count(&self) -> usize {
        self.port_count
    }

    #[must_use]
    pub fn half_ports(&self) -> usize {
        self.port_count / 2
    }

    #[must_use]
    pub fn topology(&self) -> TopologyVariant {
        self.topology
    }

    #[must_use]
    pub fn policy(&self) -> ReroutePolicy {
        self.policy
    }

    /// Whether a port on a switch at `level` leads down the tree.
    #[must_use]
    pub fn is_down_port(&self, level: usize, port: usize) -> bool {
        level == crate::label::CORE_LEVEL || port <= self.half_ports()
    }

    /// Offset added to the switch index of the core reached through up-port
    /// offset `group` of an aggregation switch in `pod`.
    ///
    /// The efficient shuffle is `group * pod + group^2 * (pod / h)`, modulo
    /// `h`. For `k >= 6` any two pods disagree on where at least one group
    /// leads, so rotating through the groups always finds a different
    /// aggregation switch in the destination pod.
    fn core_shuffle(&self, pod: usize, group: usize) -> usize {
        match self.topology {
            TopologyVariant::Regular => 0,
            TopologyVariant::Efficient => {
                let h = self.half_ports();
                (group * pod + group * group * (pod / h)) % h
            }
        }
    }

    /// The core switch at the end of up-port offset `group` of aggregation
    /// switch `agg` in `pod`.
    #[must_use]
    pub fn core_above(&self, pod: usize, agg: usize, group: usize) -> PositionLabel {
        let h = self.half_ports();
        PositionLabel::core(group, (agg + self.core_shuffle(pod, group)) % h)
    }

    /// Index of the aggregation switch in `pod` that is connected to `core`.
    #[must_use]
    pub fn aggregation_below(&self, core: &PositionLabel, pod: usize) -> usize {
        let h = self.half_ports();
        (core.switch_idx + h - self.core_shuffle(pod, core.pod)) % h
    }

    /// Check that a port number is valid for this radix.
    pub fn check_port(&self, port: usize) -> SimResult {
        if port == 0 || port > self.port_count {
            return sim_error!(format!(
                "Port {port} is outside 1..={}",
                self.port_count
            ));
        }
        Ok(())
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            port_count: 8,
            topology: TopologyVariant::default(),
            policy: ReroutePolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn radix_checks() {
        assert!(RoutingConfig::new(8, TopologyVariant::Regular, ReroutePolicy::LocalVTurn).is_ok());
        assert!(RoutingConfig::new(4, TopologyVariant::Efficient, ReroutePolicy::BacktrackOnly).is_ok());
        assert!(RoutingConfig::new(7, TopologyVariant::Regular, ReroutePolicy::LocalVTurn).is_err());
        assert!(RoutingConfig::new(2, TopologyVariant::Regular, ReroutePolicy::LocalVTurn).is_err());
        assert!(RoutingConfig::new(18, TopologyVariant::Regular, ReroutePolicy::LocalVTurn).is_err());
    }

    #[test]
    fn port_directions() {
        let config = RoutingConfig::default();
        assert!(config.is_down_port(0, 8));
        assert!(config.is_down_port(1, 4));
        assert!(!config.is_down_port(1, 5));
        assert!(config.is_down_port(2, 1));
        assert!(!config.is_down_port(2, 8));
    }

    #[test]
    fn regular_core_wiring() {
        let config = RoutingConfig::default();
        for (pod, agg, group) in itertools::iproduct!(0..8, 0..4, 0..4) {
            let core = config.core_above(pod, agg, group);
            assert_eq!(core, PositionLabel::core(group, agg));
            assert_eq!(config.aggregation_below(&core, pod), agg);
        }
    }

    #[test]
    fn efficient_core_wiring() {
        let config =
            RoutingConfig::new(8, TopologyVariant::Efficient, ReroutePolicy::BacktrackOnly).unwrap();

        // Pod 0 is wired like the regular tree
        assert_eq!(config.core_above(0, 2, 3), PositionLabel::core(3, 2));
        assert_eq!(config.core_above(1, 0, 1), PositionLabel::core(1, 1));
        assert_eq!(config.core_above(5, 2, 2), PositionLabel::core(2, 0));
        assert_eq!(config.aggregation_below(&PositionLabel::core(1, 0), 1), 3);

        for (pod, group) in itertools::iproduct!(0..8, 0..4) {
            let mut switches: Vec<_> = (0..4)
                .map(|agg| config.core_above(pod, agg, group))
                .inspect(|core| assert_eq!(core.pod, group))
                .map(|core| core.switch_idx)
                .collect();
            switches.sort_unstable();
            assert_eq!(switches, [0, 1, 2, 3], "pod {pod} group {group}");
            for agg in 0..4 {
                let core = config.core_above(pod, agg, group);
                assert_eq!(config.aggregation_below(&core, pod), agg);
            }
        }
    }

    #[test]
    fn efficient_pods_disagree() {
        for port_count in [6, 8, 10, 16] {
            let config = RoutingConfig::new(
                port_count,
                TopologyVariant::Efficient,
                ReroutePolicy::LocalVTurn,
            )
            .unwrap();
            let h = config.half_ports();
            for (src, dst) in itertools::iproduct!(0..port_count, 0..port_count) {
                if src == dst {
                    continue;
                }
                let reached: HashSet<_> = (0..h)
                    .map(|group| config.aggregation_below(&config.core_above(src, 0, group), dst))
                    .collect();
                assert!(reached.len() > 1, "k={port_count} pods {src} -> {dst}");
            }
        }
    }

    #[test]
    fn port_range() {
        let config = RoutingConfig::default();
        assert!(config.check_port(0).is_err());
        assert!(config.check_port(1).is_ok());
        assert!(config.check_port(8).is_ok());
        assert!(config.check_port(9).is_err());
    }
}
