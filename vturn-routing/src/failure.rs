// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The table of failed output ports.
//!
//! A single [`FailureTable`] is shared by every switch in a network. It is
//! only written by fault injection and read by the forwarding engines.

use std::cell::RefCell;
use std::collections::HashMap;

use vturn_engine::sim_error;
use vturn_engine::types::SimResult;

use crate::config::RoutingConfig;
use crate::label::{EDGE_LEVEL, PositionLabel};

/// Maps a switch to the one output port that is currently down.
pub struct FailureTable {
    config: RoutingConfig,
    failed: RefCell<HashMap<PositionLabel, usize>>,
}

impl FailureTable {
    #[must_use]
    pub fn new(config: &RoutingConfig) -> Self {
        Self {
            config: config.clone(),
            failed: RefCell::new(HashMap::new()),
        }
    }

    /// Mark `port` of `node` as failed, replacing any earlier failure at
    /// that node.
    ///
    /// Edge ports that lead to servers cannot be failed because no other
    /// path reaches a server.
    pub fn set_failure(&self, node: PositionLabel, port: usize) -> SimResult {
        if !node.is_switch_level() {
            return sim_error!(format!("Cannot fail a port of {node}, it is not a switch"));
        }
        self.config.check_port(port)?;
        if node.level == EDGE_LEVEL && self.config.is_down_port(EDGE_LEVEL, port) {
            return sim_error!(format!(
                "Cannot fail port {port} of edge switch {node}, it is the only path to a server"
            ));
        }
        self.failed.borrow_mut().insert(node, port);
        Ok(())
    }

    /// Remove every failure.
    pub fn clear(&self) {
        self.failed.borrow_mut().clear();
    }

    /// The failed port at `node`, if there is one.
    #[must_use]
    pub fn failed_port(&self, node: &PositionLabel) -> Option<usize> {
        self.failed.borrow().get(node).copied()
    }

    /// A link is down only if it is the failed port recorded for the node.
    #[must_use]
    pub fn is_link_up(&self, node: &PositionLabel, port: usize) -> bool {
        self.failed_port(node) != Some(port)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.failed.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failed.borrow().is_empty()
    }

    /// All failures, sorted by node.
    #[must_use]
    pub fn failures(&self) -> Vec<(PositionLabel, usize)> {
        let mut failures: Vec<_> = self
            .failed
            .borrow()
            .iter()
            .map(|(node, port)| (*node, *port))
            .collect();
        failures.sort();
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_state() {
        let table = FailureTable::new(&RoutingConfig::default());
        let agg = PositionLabel::aggregation(0, 0);
        assert!(table.is_link_up(&agg, 5));

        table.set_failure(agg, 5).unwrap();
        assert!(!table.is_link_up(&agg, 5));
        assert!(table.is_link_up(&agg, 6));
        assert!(table.is_link_up(&PositionLabel::aggregation(0, 1), 5));
        assert_eq!(table.failed_port(&agg), Some(5));
    }

    #[test]
    fn one_failure_per_node() {
        let table = FailureTable::new(&RoutingConfig::default());
        let agg = PositionLabel::aggregation(1, 2);
        table.set_failure(agg, 5).unwrap();
        table.set_failure(agg, 2).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.is_link_up(&agg, 5));
        assert!(!table.is_link_up(&agg, 2));
    }

    #[test]
    fn invalid_failures() {
        let table = FailureTable::new(&RoutingConfig::default());
        assert!(table.set_failure(PositionLabel::edge(0, 0), 1).is_err());
        assert!(table.set_failure(PositionLabel::edge(0, 0), 0).is_err());
        assert!(table.set_failure(PositionLabel::core(0, 0), 9).is_err());
        assert!(table.set_failure(PositionLabel::server(0, 0, 3), 1).is_err());
        assert!(table.is_empty());

        table.set_failure(PositionLabel::edge(0, 0), 5).unwrap();
        table.set_failure(PositionLabel::core(0, 0), 2).unwrap();
        assert_eq!(
            table.failures(),
            vec![
                (PositionLabel::core(0, 0), 2),
                (PositionLabel::edge(0, 0), 5)
            ]
        );
    }

    #[test]
    fn core_ports_all_lead_down() {
        let table = FailureTable::new(&RoutingConfig::default());
        let core = PositionLabel::core(3, 3);
        for port in 1..=8 {
            table.set_failure(core, port).unwrap();
            assert_eq!(table.failed_port(&core), Some(port));
        }
        let err = table.set_failure(core, 9).unwrap_err();
        assert_eq!(err.to_string(), "Error: Port 9 is outside 1..=8");
        assert_eq!(table.failed_port(&core), Some(8));
    }

    #[test]
    fn clear() {
        let table = FailureTable::new(&RoutingConfig::default());
        table.set_failure(PositionLabel::aggregation(0, 0), 6).unwrap();
        table.clear();
        assert!(table.is_empty());
        assert!(table.is_link_up(&PositionLabel::aggregation(0, 0), 6));
    }
}
