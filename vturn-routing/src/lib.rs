// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

#![doc(test(attr(warn(unused))))]

//! Self-routing with local failover for k-ary fat-trees.
//!
//! Every switch is given a [`PositionLabel`](crate::label::PositionLabel)
//! when the network is built and every packet carries
//! [`PacketTags`](crate::tags::PacketTags) naming its source, destination and
//! turning switch. That is enough for a switch to pick an output port without
//! any routing table:
//!
//! ```text
//!   level 0          core (c,s,0)        ports 1..=k lead to pods 0..k
//!                    /          \
//!   level 1    agg (p,s,1)  ...         ports h+1+c up to core (c,s,0)
//!                 |    \                 ports 1..=h down to edges
//!   level 2    edge (p,e,2) ...         ports h+1+a up to agg (p,a,1)
//!                 |                      ports 1..=h down to servers
//!   servers    (p,e,host)
//! ```
//!
//! where `k` is the port count and `h = k / 2`. A packet climbs towards its
//! turning switch and then descends towards its destination.
//!
//! When the canonical port is down a
//! [`SwitchRouter`](crate::router::SwitchRouter) picks a detour locally,
//! possibly becoming the new turning switch for the flow (a V-turn), and
//! caches the choice so that later packets of the flow follow the same path.
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use vturn_routing::config::RoutingConfig;
//! use vturn_routing::failure::FailureTable;
//! use vturn_routing::label::PositionLabel;
//! use vturn_routing::router::{DecisionKind, SwitchRouter};
//! use vturn_routing::tags::PacketTags;
//! use vturn_track::entity::toplevel;
//! use vturn_track::tracker::dev_null_tracker;
//!
//! let top = toplevel(&dev_null_tracker(), "top");
//! let config = Rc::new(RoutingConfig::default());
//! let failures = Rc::new(FailureTable::new(&config));
//!
//! let agg = PositionLabel::aggregation(0, 0);
//! let mut router = SwitchRouter::new(&top, agg, &config, &failures).unwrap();
//!
//! let src = PositionLabel::server(0, 0, 0);
//! let dst = PositionLabel::server(1, 0, 0);
//! let mut tags = PacketTags::new(src, dst, PositionLabel::core(0, 0));
//!
//! // Up to core (0,0,0)
//! assert_eq!(router.forward(&mut tags, 1).unwrap().port, 5);
//!
//! // After a failure the packet takes the next core switch instead
//! failures.set_failure(agg, 5).unwrap();
//! let mut tags = PacketTags::new(src, dst, PositionLabel::core(0, 0));
//! let decision = router.forward(&mut tags, 1).unwrap();
//! assert_eq!(decision.port, 6);
//! assert_eq!(decision.kind, DecisionKind::Recovery);
//! assert_eq!(tags.turning, PositionLabel::core(1, 0));
//! ```

pub mod cache;
pub mod config;
pub mod failure;
pub mod forwarding;
pub mod label;
pub mod router;
pub mod tags;
