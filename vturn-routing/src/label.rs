// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Position labels.
//!
//! Every switch and server in the fat-tree is identified by a
//! [`PositionLabel`] assigned when the topology is built. For switches the
//! third field is the tree level. Servers carry the index of the host below
//! their edge switch in that field instead.

use std::fmt;
use std::str::FromStr;

use vturn_engine::types::SimError;

/// Level of the core switches.
pub const CORE_LEVEL: usize = 0;

/// Level of the upper aggregation switches.
pub const AGGREGATION_LEVEL: usize = 1;

/// Level of the lower aggregation (edge) switches.
pub const EDGE_LEVEL: usize = 2;

/// The place of a node in the fat-tree.
///
/// Labels are compared structurally and ordered by `(pod, switch_idx, level)`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PositionLabel {
    /// Pod of an aggregation/edge switch or server. For a core switch this is
    /// the core group, which is also the up-port offset used to reach it.
    pub pod: usize,

    /// Index of the switch within its pod (or within its core group).
    pub switch_idx: usize,

    /// Tree level of a switch, or host index of a server.
    pub level: usize,
}

impl PositionLabel {
    #[must_use]
    pub const fn new(pod: usize, switch_idx: usize, level: usize) -> Self {
        Self {
            pod,
            switch_idx,
            level,
        }
    }

    /// Label of the core switch `switch_idx` in core group `group`.
    #[must_use]
    pub const fn core(group: usize, switch_idx: usize) -> Self {
        Self::new(group, switch_idx, CORE_LEVEL)
    }

    #[must_use]
    pub const fn aggregation(pod: usize, switch_idx: usize) -> Self {
        Self::new(pod, switch_idx, AGGREGATION_LEVEL)
    }

    #[must_use]
    pub const fn edge(pod: usize, switch_idx: usize) -> Self {
        Self::new(pod, switch_idx, EDGE_LEVEL)
    }

    /// Label of host `host` below edge switch `edge` of `pod`.
    #[must_use]
    pub const fn server(pod: usize, edge: usize, host: usize) -> Self {
        Self::new(pod, edge, host)
    }

    /// Label of the edge switch a server is attached to.
    #[must_use]
    pub const fn edge_of_server(&self) -> Self {
        Self::edge(self.pod, self.switch_idx)
    }

    /// Whether this label names a forwarding switch rather than a server.
    ///
    /// This only makes sense for labels of switches; a server label with a
    /// small host index looks like a switch label.
    #[must_use]
    pub const fn is_switch_level(&self) -> bool {
        self.level <= EDGE_LEVEL
    }
}

impl fmt::Display for PositionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.pod, self.switch_idx, self.level)
    }
}

impl FromStr for PositionLabel {
    type Err = SimError;

    /// Parse a label of the form `pod.switch.level`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim().split('.').collect();
        if fields.len() != 3 {
            return Err(SimError(format!(
                "Position label '{s}' should be of the form pod.switch.level"
            )));
        }
        let mut values = [0; 3];
        for (value, field) in values.iter_mut().zip(&fields) {
            *value = field
                .parse::<usize>()
                .map_err(|e| SimError(format!("Position label '{s}': {e}")))?;
        }
        Ok(Self::new(values[0], values[1], values[2]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let label: PositionLabel = "1.2.0".parse().unwrap();
        assert_eq!(label, PositionLabel::core(1, 2));
        assert_eq!(label.to_string(), "1.2.0");

        let label: PositionLabel = " 3.0.2 ".parse().unwrap();
        assert_eq!(label, PositionLabel::edge(3, 0));
    }

    #[test]
    fn parse_errors() {
        assert!("1.2".parse::<PositionLabel>().is_err());
        assert!("1.2.3.4".parse::<PositionLabel>().is_err());
        assert!("a.2.0".parse::<PositionLabel>().is_err());
        assert!("1.-2.0".parse::<PositionLabel>().is_err());
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(PositionLabel::new(0, 1, 2), PositionLabel::edge(0, 1));
        assert_ne!(PositionLabel::edge(0, 1), PositionLabel::aggregation(0, 1));
        assert_ne!(PositionLabel::core(1, 0), PositionLabel::core(0, 1));
    }

    #[test]
    fn server_edge() {
        let server = PositionLabel::server(2, 1, 3);
        assert_eq!(server.edge_of_server(), PositionLabel::edge(2, 1));
        assert!(!server.is_switch_level());
    }
}
