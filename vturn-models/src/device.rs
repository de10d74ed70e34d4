// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Point-to-point network devices.
//!
//! Every port of a node has a [`PointToPointDevice`] that owns the transmit
//! queue for that port and serialises packets onto the link one at a time.

use std::rc::Rc;

use vturn_track::entity::Entity;
use vturn_track::{debug, exit};

use crate::packet::Packet;
use crate::queue::{DropTailQueue, QueueMode, QueueStats};

/// The far end of the link attached to a device.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Peer {
    /// Index of the peer node within its network.
    pub node: usize,
    pub port: usize,
}

/// A packet that has started transmission.
#[derive(Debug)]
pub struct Transmission {
    pub packet: Packet,
    pub peer: Peer,

    /// Time for the last bit to leave the device.
    pub tx_ns: u64,

    /// Time for the packet to arrive at the peer.
    pub arrive_ns: u64,
}

pub struct PointToPointDevice {
    pub entity: Rc<Entity>,
    port: usize,
    peer: Option<Peer>,
    data_rate_gbps: f64,
    delay_ns: u64,
    queue: DropTailQueue,
    busy: bool,
    tx_packets: u64,
    tx_bytes: u64,
}

impl PointToPointDevice {
    #[must_use]
    pub fn new(
        parent: &Rc<Entity>,
        port: usize,
        data_rate_gbps: f64,
        delay_ns: u64,
        queue_mode: QueueMode,
        queue_limit: Option<usize>,
    ) -> Self {
        Self {
            entity: Rc::new(Entity::new(parent, &format!("port{port}"))),
            port,
            peer: None,
            data_rate_gbps,
            delay_ns,
            queue: DropTailQueue::new(queue_mode, queue_limit),
            busy: false,
            tx_packets: 0,
            tx_bytes: 0,
        }
    }

    pub fn connect(&mut self, peer: Peer) {
        self.peer = Some(peer);
    }

    #[must_use]
    pub fn port(&self) -> usize {
        self.port
    }

    #[must_use]
    pub fn peer(&self) -> Option<Peer> {
        self.peer
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Time to serialise `bytes` onto the link.
    #[must_use]
    pub fn transmit_time_ns(&self, bytes: usize) -> u64 {
        ((bytes * 8) as f64 / self.data_rate_gbps).ceil() as u64
    }

    /// Queue a packet for transmission. The packet is returned if the queue
    /// is full.
    pub fn enqueue(&mut self, packet: Packet) -> Result<(), Packet> {
        self.queue.enqueue(packet).inspect_err(|packet| {
            debug!(self.entity ; "queue full, dropped {}", packet);
        })
    }

    /// Start sending the packet at the head of the queue if the device is
    /// idle.
    pub fn start_transmit(&mut self) -> Option<Transmission> {
        if self.busy {
            return None;
        }
        let peer = self.peer?;
        let packet = self.queue.dequeue()?;
        exit!(self.entity ; packet.id);

        self.busy = true;
        self.tx_packets += 1;
        self.tx_bytes += packet.bytes as u64;

        let tx_ns = self.transmit_time_ns(packet.bytes);
        Some(Transmission {
            packet,
            peer,
            tx_ns,
            arrive_ns: tx_ns + self.delay_ns,
        })
    }

    /// The current transmission has finished.
    pub fn finish_transmit(&mut self) {
        self.busy = false;
    }

    #[must_use]
    pub fn queue(&self) -> &DropTailQueue {
        &self.queue
    }

    #[must_use]
    pub fn queue_stats(&self) -> &QueueStats {
        self.queue.stats()
    }

    #[must_use]
    pub fn tx_packets(&self) -> u64 {
        self.tx_packets
    }

    #[must_use]
    pub fn tx_bytes(&self) -> u64 {
        self.tx_bytes
    }
}

#[cfg(test)]
mod tests {
    use vturn_routing::label::PositionLabel;
    use vturn_routing::tags::PacketTags;
    use vturn_track::entity::toplevel;
    use vturn_track::tracker::dev_null_tracker;

    use super::*;
    use crate::packet::Protocol;

    fn device(top: &Rc<Entity>) -> PointToPointDevice {
        let mut device = PointToPointDevice::new(top, 1, 10.0, 500, QueueMode::Packets, Some(4));
        device.connect(Peer { node: 3, port: 2 });
        device
    }

    fn packet(top: &Rc<Entity>, bytes: usize) -> Packet {
        let tags = PacketTags::new(
            PositionLabel::server(0, 0, 0),
            PositionLabel::server(0, 1, 0),
            PositionLabel::aggregation(0, 0),
        );
        Packet::new(top, tags, 0, 0, bytes, Protocol::Udp, 0)
    }

    #[test]
    fn transmit_time() {
        let top = toplevel(&dev_null_tracker(), "top");
        let device = device(&top);
        assert_eq!(device.transmit_time_ns(1000), 800);
        assert_eq!(device.transmit_time_ns(1), 1);

        let slow = PointToPointDevice::new(&top, 2, 1.0, 0, QueueMode::Packets, None);
        assert_eq!(slow.transmit_time_ns(1500), 12000);
    }

    #[test]
    fn one_at_a_time() {
        let top = toplevel(&dev_null_tracker(), "top");
        let mut device = device(&top);
        device.enqueue(packet(&top, 1000)).unwrap();
        device.enqueue(packet(&top, 500)).unwrap();

        let tx = device.start_transmit().unwrap();
        assert_eq!(tx.peer, Peer { node: 3, port: 2 });
        assert_eq!(tx.tx_ns, 800);
        assert_eq!(tx.arrive_ns, 1300);
        assert!(device.start_transmit().is_none());

        device.finish_transmit();
        let tx = device.start_transmit().unwrap();
        assert_eq!(tx.packet.bytes, 500);
        device.finish_transmit();
        assert!(device.start_transmit().is_none());
        assert_eq!(device.tx_packets(), 2);
        assert_eq!(device.tx_bytes(), 1500);
    }

    #[test]
    fn unconnected_device_holds_packets() {
        let top = toplevel(&dev_null_tracker(), "top");
        let mut device = PointToPointDevice::new(&top, 1, 1.0, 0, QueueMode::Packets, None);
        device.enqueue(packet(&top, 100)).unwrap();
        assert!(device.start_transmit().is_none());
        assert_eq!(device.queue().len(), 1);
    }
}
