// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use vturn_engine::engine::Engine;
use vturn_engine::test_helpers::start_test;
use vturn_routing::config::{ReroutePolicy, TopologyVariant};

use crate::fat_tree::FatTreeConfig;
use crate::network::{NetEvent, Network};

/// Build an 8-port fat-tree and an engine that logs to
/// `traces/<test file name>.log`.
#[must_use]
pub fn create_network(
    full_filepath: &str,
    topology: TopologyVariant,
    policy: ReroutePolicy,
) -> (Engine<NetEvent>, Network) {
    let config = FatTreeConfig::new(8, topology, policy).unwrap();
    create_network_with(full_filepath, config)
}

#[must_use]
pub fn create_network_with(
    full_filepath: &str,
    config: FatTreeConfig,
) -> (Engine<NetEvent>, Network) {
    let engine = start_test(full_filepath);
    let network = Network::new(engine.top(), "net", config).unwrap();
    (engine, network)
}
