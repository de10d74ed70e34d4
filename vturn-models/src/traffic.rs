// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Traffic flows between servers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand::seq::SliceRandom;
use vturn_engine::sim_error;
use vturn_engine::types::{SimError, SimResult};
use vturn_routing::label::PositionLabel;

use crate::fat_tree::FatTreeConfig;
use crate::packet::Protocol;

/// A stream of equally sized packets sent at a fixed interval.
#[derive(Clone, Debug, PartialEq)]
pub struct Flow {
    pub src: PositionLabel,
    pub dst: PositionLabel,
    pub num_packets: u64,
    pub packet_bytes: usize,
    pub interval_ns: u64,
    pub start_ns: u64,
    pub protocol: Protocol,
}

impl Flow {
    #[must_use]
    pub fn new(src: PositionLabel, dst: PositionLabel) -> Self {
        Self {
            src,
            dst,
            num_packets: 1,
            packet_bytes: 1000,
            interval_ns: 10_000,
            start_ns: 0,
            protocol: Protocol::default(),
        }
    }

    #[must_use]
    pub fn packets(mut self, num_packets: u64, packet_bytes: usize, interval_ns: u64) -> Self {
        self.num_packets = num_packets;
        self.packet_bytes = packet_bytes;
        self.interval_ns = interval_ns;
        self
    }

    #[must_use]
    pub fn start_at(mut self, start_ns: u64) -> Self {
        self.start_ns = start_ns;
        self
    }

    #[must_use]
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Check that both ends are distinct servers of the tree.
    pub fn validate(&self, config: &FatTreeConfig) -> SimResult {
        for (end, label) in [("source", self.src), ("destination", self.dst)] {
            if !config.is_server(&label) {
                return sim_error!(format!("Flow {end} {label} is not a server"));
            }
        }
        if self.src == self.dst {
            return sim_error!(format!("Flow from {} to itself", self.src));
        }
        if self.packet_bytes == 0 {
            return sim_error!(format!("Flow {} -> {} has empty packets", self.src, self.dst));
        }
        Ok(())
    }
}

/// The switch at which a packet from `src` to `dst` should stop climbing.
///
/// This is the lowest level that connects the two servers. Where there is a
/// choice of switch it is taken from the host indices so that every packet of
/// a flow uses the same path.
#[must_use]
pub fn initial_turning(
    config: &FatTreeConfig,
    src: &PositionLabel,
    dst: &PositionLabel,
) -> PositionLabel {
    let h = config.half_ports();
    if src.pod == dst.pod && src.switch_idx == dst.switch_idx {
        src.edge_of_server()
    } else if src.pod == dst.pod {
        PositionLabel::aggregation(src.pod, (src.level + dst.level) % h)
    } else {
        PositionLabel::core(dst.level % h, src.level % h)
    }
}

/// Parameters shared by generated flows.
#[derive(Clone, Debug)]
pub struct FlowTemplate {
    pub num_packets: u64,
    pub packet_bytes: usize,
    pub interval_ns: u64,
    pub protocol: Protocol,
}

/// Create up to `num_flows` flows between randomly paired servers.
///
/// The servers are shuffled and each sends to the next one in the shuffled
/// order, so no server is the source or destination of more than one flow.
/// Start times are spread across one interval.
pub fn permutation_flows(
    config: &FatTreeConfig,
    template: &FlowTemplate,
    num_flows: usize,
    seed: u64,
) -> Result<Vec<Flow>, SimError> {
    let mut servers = config.servers();
    if num_flows > servers.len() {
        return sim_error!(format!(
            "Cannot create {num_flows} flows between {} servers",
            servers.len()
        ));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    servers.shuffle(&mut rng);

    let flows = (0..num_flows)
        .map(|i| {
            let start_ns = if template.interval_ns > 0 {
                rng.gen_range(0..template.interval_ns)
            } else {
                0
            };
            Flow::new(servers[i], servers[(i + 1) % servers.len()])
                .packets(template.num_packets, template.packet_bytes, template.interval_ns)
                .start_at(start_ns)
                .protocol(template.protocol)
        })
        .collect();
    Ok(flows)
}
