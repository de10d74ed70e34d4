// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! A fat-tree network of switches and servers driven by the event engine.
//!
//! The [`Network`] owns every node, the shared failure table and the traffic
//! flows. It implements [`Handler`] for [`NetEvent`]s:
//!
//!  - `Inject` creates the next packet of a flow at its source server,
//!  - `Arrive` passes a packet to the node at the far end of a link,
//!  - `TxComplete` frees a device to send its next queued packet,
//!  - `Fault` sets or clears link failures.

use std::collections::HashMap;
use std::rc::Rc;

use vturn_engine::engine::Engine;
use vturn_engine::sim_error;
use vturn_engine::traits::Handler;
use vturn_engine::types::{SimError, SimResult};
use vturn_routing::config::RoutingConfig;
use vturn_routing::failure::FailureTable;
use vturn_routing::label::PositionLabel;
use vturn_routing::router::{ForwardingStats, SwitchRouter, clear_failure};
use vturn_routing::tags::PacketTags;
use vturn_track::entity::Entity;
use vturn_track::{debug, destroy, info, trace, warn};

use crate::device::Peer;
use crate::fat_tree::{FatTreeConfig, NodeId};
use crate::faults::FaultAction;
use crate::node::{Node, Receipt};
use crate::packet::Packet;
use crate::queue::QueueStats;
use crate::stats::NetworkStats;
use crate::traffic::{Flow, initial_turning};

#[derive(Debug)]
pub enum NetEvent {
    /// Send the next packet of a flow.
    Inject { flow: usize },

    /// A packet reached the end of a link.
    Arrive {
        node: usize,
        port: usize,
        packet: Packet,
    },

    /// A device finished sending a packet.
    TxComplete { node: usize, port: usize },

    Fault(FaultAction),
}

struct FlowState {
    flow: Flow,
    turning: PositionLabel,
    sent: u64,
}

pub struct Network {
    pub entity: Rc<Entity>,
    config: FatTreeConfig,
    failures: Rc<FailureTable>,
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    flows: Vec<FlowState>,
    stats: NetworkStats,
}

impl Network {
    /// Build every switch and server of the tree and connect them.
    pub fn new(parent: &Rc<Entity>, name: &str, config: FatTreeConfig) -> Result<Self, SimError> {
        let entity = Rc::new(Entity::new(parent, name));
        let routing = Rc::new(config.routing().clone());
        let failures = Rc::new(FailureTable::new(&routing));

        let ids = config
            .switches()
            .into_iter()
            .map(NodeId::Switch)
            .chain(config.servers().into_iter().map(NodeId::Server));

        let mut nodes = Vec::with_capacity(config.num_switches() + config.num_servers());
        let mut index = HashMap::new();
        for id in ids {
            index.insert(id, nodes.len());
            nodes.push(Node::new(&entity, id, &config, &routing, &failures)?);
        }

        let mut network = Self {
            entity,
            config,
            failures,
            nodes,
            index,
            flows: Vec::new(),
            stats: NetworkStats::default(),
        };
        for link in network.config.links() {
            let a = network.node_index(&link.a.node)?;
            let b = network.node_index(&link.b.node)?;
            network.nodes[a]
                .device_mut(link.a.port)?
                .connect(Peer { node: b, port: link.b.port });
            network.nodes[b]
                .device_mut(link.b.port)?
                .connect(Peer { node: a, port: link.a.port });
        }

        info!(network.entity ; "{}-port fat-tree: {} switches, {} servers, {} topology, {} rerouting",
            network.config.port_count(),
            network.config.num_switches(),
            network.config.num_servers(),
            network.routing().topology(),
            network.routing().policy());
        Ok(network)
    }

    #[must_use]
    pub fn config(&self) -> &FatTreeConfig {
        &self.config
    }

    #[must_use]
    pub fn routing(&self) -> &RoutingConfig {
        self.config.routing()
    }

    #[must_use]
    pub fn failures(&self) -> &Rc<FailureTable> {
        &self.failures
    }

    #[must_use]
    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    fn node_index(&self, id: &NodeId) -> Result<usize, SimError> {
        match self.index.get(id) {
            Some(index) => Ok(*index),
            None => sim_error!(format!("Unknown node {id}")),
        }
    }

    pub fn node(&self, id: &NodeId) -> Result<&Node, SimError> {
        let index = self.node_index(id)?;
        Ok(&self.nodes[index])
    }

    pub fn router(&self, label: PositionLabel) -> Result<&SwitchRouter, SimError> {
        match self.node(&NodeId::Switch(label))?.router() {
            Some(router) => Ok(router),
            None => sim_error!(format!("{label} has no router")),
        }
    }

    /// Decision counts summed over all switches.
    #[must_use]
    pub fn forwarding_stats(&self) -> ForwardingStats {
        let mut total = ForwardingStats::default();
        for router in self.nodes.iter().filter_map(Node::router) {
            total.accumulate(&router.stats());
        }
        total
    }

    /// Queue counters summed over all devices.
    #[must_use]
    pub fn queue_stats(&self) -> QueueStats {
        let mut total = QueueStats::default();
        for device in self.nodes.iter().flat_map(|n| n.devices()) {
            total.accumulate(device.queue_stats());
        }
        total
    }

    /// Add a flow and schedule its first packet.
    pub fn add_flow(&mut self, engine: &mut Engine<NetEvent>, flow: Flow) -> SimResult {
        flow.validate(&self.config)?;
        let index = self.flows.len();
        let turning = initial_turning(&self.config, &flow.src, &flow.dst);
        if flow.num_packets > 0 {
            engine.schedule_at(flow.start_ns, NetEvent::Inject { flow: index })?;
        }
        debug!(self.entity ; "flow {index}: {} -> {} via {turning}", flow.src, flow.dst);
        self.flows.push(FlowState {
            flow,
            turning,
            sent: 0,
        });
        self.stats.flow_delivered.push(0);
        Ok(())
    }

    /// Fail a switch port now.
    pub fn set_failure(&mut self, node: PositionLabel, port: usize) -> SimResult {
        if !self.config.is_switch(&node) {
            return sim_error!(format!("Cannot fail {node}:{port}, no such switch"));
        }
        self.failures.set_failure(node, port)?;
        info!(self.entity ; "link {node}:{port} down");
        Ok(())
    }

    /// Repair every port and forget every detour.
    pub fn clear_failure(&mut self) -> SimResult {
        clear_failure(
            &self.failures,
            self.nodes.iter_mut().filter_map(Node::router_mut),
        )?;
        info!(self.entity ; "all links up");
        Ok(())
    }

    fn inject(&mut self, engine: &mut Engine<NetEvent>, flow_index: usize) -> SimResult {
        let Some(state) = self.flows.get_mut(flow_index) else {
            return sim_error!(format!("Unknown flow {flow_index}"));
        };
        let flow = &state.flow;
        let src = *self
            .index
            .get(&NodeId::Server(flow.src))
            .ok_or_else(|| SimError(format!("Unknown server {}", flow.src)))?;

        let tags = PacketTags::new(flow.src, flow.dst, state.turning);
        let packet = Packet::new(
            &self.nodes[src].entity,
            tags,
            flow_index,
            state.sent,
            flow.packet_bytes,
            flow.protocol,
            engine.time_now_ns(),
        )
        .with_ttl(self.config.ttl());

        state.sent += 1;
        if state.sent < flow.num_packets {
            engine.schedule_in(flow.interval_ns, NetEvent::Inject { flow: flow_index });
        }

        self.stats.sent += 1;
        self.send(engine, src, 1, packet)
    }

    /// Queue a packet on a device and start transmitting if it is idle.
    fn send(
        &mut self,
        engine: &mut Engine<NetEvent>,
        node: usize,
        port: usize,
        packet: Packet,
    ) -> SimResult {
        let node_ref = &mut self.nodes[node];
        if !node_ref.is_link_up(port) {
            warn!(node_ref.entity ; "link on port {port} is down, dropped {}", packet);
            destroy!(node_ref.entity ; packet.id);
            self.stats.link_dropped += 1;
            return Ok(());
        }
        if let Err(packet) = node_ref.device_mut(port)?.enqueue(packet) {
            destroy!(node_ref.entity ; packet.id);
            self.stats.queue_dropped += 1;
            return Ok(());
        }
        self.start_transmit(engine, node, port)
    }

    fn start_transmit(
        &mut self,
        engine: &mut Engine<NetEvent>,
        node: usize,
        port: usize,
    ) -> SimResult {
        if let Some(tx) = self.nodes[node].device_mut(port)?.start_transmit() {
            engine.schedule_in(tx.tx_ns, NetEvent::TxComplete { node, port });
            engine.schedule_in(
                tx.arrive_ns,
                NetEvent::Arrive {
                    node: tx.peer.node,
                    port: tx.peer.port,
                    packet: tx.packet,
                },
            );
        }
        Ok(())
    }

    fn arrive(
        &mut self,
        engine: &mut Engine<NetEvent>,
        node: usize,
        port: usize,
        mut packet: Packet,
    ) -> SimResult {
        let receipt = self.nodes[node].receive(&mut packet, port)?;
        let entity = self.nodes[node].entity.clone();
        match receipt {
            Receipt::Forward(decision) => return self.send(engine, node, decision.port, packet),
            Receipt::Deliver => {
                let latency_ns = engine.time_now_ns() - packet.created_ns;
                trace!(entity ; "delivered {} after {} hops, {latency_ns}ns", packet, packet.hops);
                self.stats.delivered += 1;
                self.stats.total_hops += u64::from(packet.hops);
                self.stats.total_latency_ns += latency_ns;
                if packet.tags.revised {
                    self.stats.revised_delivered += 1;
                }
                if let Some(count) = self.stats.flow_delivered.get_mut(packet.flow) {
                    *count += 1;
                }
            }
            Receipt::DefaultDeliver => {
                trace!(entity ; "default handler consumed {}", packet);
                self.stats.default_delivered += 1;
            }
            Receipt::Misdelivered => {
                warn!(entity ; "dropped misdelivered {}", packet);
                self.stats.misdelivered += 1;
            }
            Receipt::TtlExpired => {
                warn!(entity ; "hop limit reached, dropped {}", packet);
                self.stats.ttl_dropped += 1;
            }
        }
        destroy!(entity ; packet.id);
        Ok(())
    }

    fn apply_fault(&mut self, action: FaultAction) -> SimResult {
        match action {
            FaultAction::Set { node, port } => self.set_failure(node, port),
            FaultAction::Clear => self.clear_failure(),
        }
    }
}

impl Handler<NetEvent> for Network {
    fn handle(&mut self, engine: &mut Engine<NetEvent>, event: NetEvent) -> SimResult {
        match event {
            NetEvent::Inject { flow } => self.inject(engine, flow),
            NetEvent::Arrive { node, port, packet } => self.arrive(engine, node, port, packet),
            NetEvent::TxComplete { node, port } => {
                self.nodes[node].device_mut(port)?.finish_transmit();
                self.start_transmit(engine, node, port)
            }
            NetEvent::Fault(action) => self.apply_fault(action),
        }
    }
}
