// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The failure-oblivious fat-tree routing rules.
//!
//! These functions are pure: they only look at labels and port numbers. The
//! [`SwitchRouter`](crate::router::SwitchRouter) combines them with the
//! failure table and the reroute cache.

use vturn_engine::sim_error;
use vturn_engine::types::SimError;

use crate::config::RoutingConfig;
use crate::label::{AGGREGATION_LEVEL, CORE_LEVEL, EDGE_LEVEL, PositionLabel};

/// The port that leads one level closer to `dst`.
///
/// Only depends on the destination, which is what makes the descent from the
/// turning switch deterministic.
pub fn descend_port(
    config: &RoutingConfig,
    node: &PositionLabel,
    dst: &PositionLabel,
) -> Result<usize, SimError> {
    let port = match node.level {
        CORE_LEVEL => dst.pod + 1,
        AGGREGATION_LEVEL => dst.switch_idx + 1,
        EDGE_LEVEL => dst.level + 1,
        level => return sim_error!(format!("Switch {node} has invalid level {level}")),
    };
    config.check_port(port)?;
    Ok(port)
}

/// The canonical output port for a packet that arrived on `input_port`.
///
/// A switch at the turning level always descends. Below the turning level a
/// packet from a down-port is sent up towards the turning switch and a packet
/// from an up-port descends. An edge switch climbing towards a core switch
/// goes to the aggregation switch of its pod that is wired to that core.
pub fn normal_forwarding_port(
    config: &RoutingConfig,
    node: &PositionLabel,
    dst: &PositionLabel,
    turning: &PositionLabel,
    input_port: usize,
) -> Result<usize, SimError> {
    if node.level == turning.level {
        return descend_port(config, node, dst);
    }
    if node.level < turning.level {
        return sim_error!(format!(
            "Switch {node} is above its turning switch {turning}"
        ));
    }

    if input_port > config.half_ports() {
        return descend_port(config, node, dst);
    }

    let offset = match node.level {
        AGGREGATION_LEVEL => turning.pod,
        EDGE_LEVEL if turning.level == CORE_LEVEL => config.aggregation_below(turning, node.pod),
        EDGE_LEVEL => turning.switch_idx,
        level => return sim_error!(format!("Switch {node} has invalid level {level}")),
    };
    let port = config.half_ports() + 1 + offset;
    config.check_port(port)?;
    Ok(port)
}

/// Whether a packet is moving towards its destination (`true`) or being
/// sent back because the switch it reached is a dead end (`false`).
///
/// A core switch is a dead end for a packet that came up from the
/// destination pod. An aggregation or edge switch is a dead end for a packet
/// that came down into the wrong pod.
pub fn is_forwarding_phase(
    config: &RoutingConfig,
    node: &PositionLabel,
    dst: &PositionLabel,
    input_port: usize,
) -> Result<bool, SimError> {
    config.check_port(input_port)?;
    match node.level {
        CORE_LEVEL => Ok(input_port - 1 != dst.pod),
        AGGREGATION_LEVEL | EDGE_LEVEL => {
            Ok(!(input_port > config.half_ports() && node.pod != dst.pod))
        }
        level => sim_error!(format!("Switch {node} has invalid level {level}")),
    }
}

/// Whether `dst` is below `node`.
#[must_use]
pub fn can_reach_destination(node: &PositionLabel, dst: &PositionLabel) -> bool {
    match node.level {
        CORE_LEVEL => true,
        AGGREGATION_LEVEL => node.pod == dst.pod,
        EDGE_LEVEL => node.pod == dst.pod && node.switch_idx == dst.switch_idx,
        _ => false,
    }
}

/// The next port after `failed_port` in the same half of the switch,
/// wrapping around within that half.
pub fn find_recovery_port(config: &RoutingConfig, failed_port: usize) -> Result<usize, SimError> {
    config.check_port(failed_port)?;
    let half = config.half_ports();
    let port = if failed_port <= half {
        failed_port % half + 1
    } else if failed_port == config.port_count() {
        half + 1
    } else {
        failed_port + 1
    };
    Ok(port)
}
