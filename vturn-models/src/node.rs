// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Switches and servers.
//!
//! A [`Node`] owns one [`PointToPointDevice`] per port. When a packet arrives
//! the node decides whether it is delivered locally, handed to the default
//! handler or forwarded by the switch's [`SwitchRouter`].

use std::rc::Rc;

use vturn_engine::sim_error;
use vturn_engine::types::SimError;
use vturn_routing::config::RoutingConfig;
use vturn_routing::failure::FailureTable;
use vturn_routing::router::{Decision, SwitchRouter};
use vturn_track::entity::Entity;
use vturn_track::{enter, trace};

use crate::device::PointToPointDevice;
use crate::fat_tree::{FatTreeConfig, NodeId};
use crate::packet::Packet;

/// What happened to a packet that arrived at a node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Receipt {
    /// The packet reached its destination server.
    Deliver,

    /// The packet is not self-routed and was consumed by the default handler.
    DefaultDeliver,

    /// The packet arrived at a server that is not its destination.
    Misdelivered,

    /// The packet has used up its hop limit.
    TtlExpired,

    /// The packet should be sent on.
    Forward(Decision),
}

pub struct Node {
    pub entity: Rc<Entity>,
    id: NodeId,
    router: Option<SwitchRouter>,
    devices: Vec<PointToPointDevice>,
}

impl Node {
    /// Create a switch or server with a device for each of its ports.
    pub fn new(
        parent: &Rc<Entity>,
        id: NodeId,
        config: &FatTreeConfig,
        routing: &Rc<RoutingConfig>,
        failures: &Rc<FailureTable>,
    ) -> Result<Self, SimError> {
        let entity = Rc::new(Entity::new(parent, &id.entity_name()));
        let (router, num_ports) = match id {
            NodeId::Switch(label) => (
                Some(SwitchRouter::new(&entity, label, routing, failures)?),
                config.port_count(),
            ),
            NodeId::Server(_) => (None, 1),
        };
        let devices = (1..=num_ports)
            .map(|port| {
                PointToPointDevice::new(
                    &entity,
                    port,
                    config.data_rate_gbps(),
                    config.delay_ns(),
                    config.queue_mode(),
                    config.queue_limit(),
                )
            })
            .collect();
        Ok(Self {
            entity,
            id,
            router,
            devices,
        })
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn is_server(&self) -> bool {
        matches!(self.id, NodeId::Server(_))
    }

    #[must_use]
    pub fn router(&self) -> Option<&SwitchRouter> {
        self.router.as_ref()
    }

    pub fn router_mut(&mut self) -> Option<&mut SwitchRouter> {
        self.router.as_mut()
    }

    #[must_use]
    pub fn devices(&self) -> &[PointToPointDevice] {
        &self.devices
    }

    pub fn device(&self, port: usize) -> Result<&PointToPointDevice, SimError> {
        match port.checked_sub(1).and_then(|i| self.devices.get(i)) {
            Some(device) => Ok(device),
            None => sim_error!(format!("{} has no port {port}", self.id)),
        }
    }

    pub fn device_mut(&mut self, port: usize) -> Result<&mut PointToPointDevice, SimError> {
        let id = self.id;
        match port.checked_sub(1).and_then(|i| self.devices.get_mut(i)) {
            Some(device) => Ok(device),
            None => sim_error!(format!("{id} has no port {port}")),
        }
    }

    /// Whether the link on `port` is usable. Server links never fail.
    #[must_use]
    pub fn is_link_up(&self, port: usize) -> bool {
        match &self.router {
            Some(router) => router.is_link_up(port),
            None => true,
        }
    }

    /// Handle a packet that arrived on `input_port`.
    ///
    /// Only routed packets that are not addressed to this node reach the
    /// switch's forwarding engine.
    pub fn receive(&mut self, packet: &mut Packet, input_port: usize) -> Result<Receipt, SimError> {
        enter!(self.entity ; packet.id);

        if self.is_deliver_up(packet) {
            return Ok(Receipt::Deliver);
        }
        if !packet.protocol.is_routed() {
            return Ok(Receipt::DefaultDeliver);
        }
        let Some(router) = self.router.as_mut() else {
            return Ok(Receipt::Misdelivered);
        };
        if packet.ttl == 0 {
            return Ok(Receipt::TtlExpired);
        }

        packet.ttl -= 1;
        packet.hops += 1;
        let decision = router.forward(&mut packet.tags, input_port)?;
        trace!(self.entity ; "{} in {input_port} out {}", packet, decision.port);
        Ok(Receipt::Forward(decision))
    }

    /// The node is a server and the packet is addressed to it.
    fn is_deliver_up(&self, packet: &Packet) -> bool {
        self.id == NodeId::Server(packet.tags.dst)
    }
}
