// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

#![doc(test(attr(warn(unused))))]

//! Models of the network around the fat-tree forwarding engine.
//!
//! A [`Network`](crate::network::Network) is built from a
//! [`FatTreeConfig`](crate::fat_tree::FatTreeConfig). Each port of each node
//! has a [`PointToPointDevice`](crate::device::PointToPointDevice) with a
//! [`DropTailQueue`](crate::queue::DropTailQueue). Packets are injected by
//! [`Flow`](crate::traffic::Flow)s and links fail according to a
//! [`FaultSchedule`](crate::faults::FaultSchedule).
//!
//! # Example
//!
//! ```rust
//! use vturn_engine::engine::Engine;
//! use vturn_engine::run_simulation;
//! use vturn_models::fat_tree::FatTreeConfig;
//! use vturn_models::network::Network;
//! use vturn_models::traffic::Flow;
//! use vturn_routing::label::PositionLabel;
//! use vturn_track::tracker::dev_null_tracker;
//!
//! let mut engine = Engine::new(&dev_null_tracker());
//! let mut network = Network::new(engine.top(), "net", FatTreeConfig::default()).unwrap();
//!
//! let flow = Flow::new(PositionLabel::server(0, 0, 0), PositionLabel::server(1, 0, 0));
//! network.add_flow(&mut engine, flow.packets(3, 1000, 5000)).unwrap();
//! run_simulation!(engine, network);
//!
//! assert_eq!(network.stats().delivered, 3);
//! assert_eq!(network.stats().total_hops, 15);
//! ```

pub mod device;
pub mod fat_tree;
pub mod faults;
pub mod network;
pub mod node;
pub mod packet;
pub mod queue;
pub mod stats;
pub mod test_helpers;
pub mod traffic;
