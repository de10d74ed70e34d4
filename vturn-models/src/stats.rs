// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Network-wide packet counters.

use std::fmt;

/// What happened to the packets injected into a network.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkStats {
    pub sent: u64,
    pub delivered: u64,

    /// Delivered packets that were rerouted at least once.
    pub revised_delivered: u64,

    /// Packets consumed by a default handler.
    pub default_delivered: u64,

    pub queue_dropped: u64,
    pub ttl_dropped: u64,

    /// Packets sent to a port whose link is down.
    pub link_dropped: u64,

    pub misdelivered: u64,

    /// Switch hops taken by delivered packets.
    pub total_hops: u64,

    /// Time from creation to delivery summed over delivered packets.
    pub total_latency_ns: u64,

    /// Packets delivered for each flow.
    pub flow_delivered: Vec<u64>,
}

impl NetworkStats {
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.queue_dropped + self.ttl_dropped + self.link_dropped + self.misdelivered
    }

    /// Packets that have not yet reached an end state.
    #[must_use]
    pub fn in_flight(&self) -> u64 {
        self.sent - self.delivered - self.default_delivered - self.dropped()
    }

    #[must_use]
    pub fn mean_hops(&self) -> f64 {
        if self.delivered == 0 {
            return 0.0;
        }
        self.total_hops as f64 / self.delivered as f64
    }

    #[must_use]
    pub fn mean_latency_ns(&self) -> f64 {
        if self.delivered == 0 {
            return 0.0;
        }
        self.total_latency_ns as f64 / self.delivered as f64
    }
}

impl fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sent {}, delivered {} ({} revised), default {}, dropped {} (queue {}, ttl {}, link {}, misdelivered {}), mean hops {:.2}",
            self.sent,
            self.delivered,
            self.revised_delivered,
            self.default_delivered,
            self.dropped(),
            self.queue_dropped,
            self.ttl_dropped,
            self.link_dropped,
            self.misdelivered,
            self.mean_hops()
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn means() {
        let mut stats = NetworkStats::default();
        assert_relative_eq!(stats.mean_hops(), 0.0);

        stats.sent = 4;
        stats.delivered = 3;
        stats.total_hops = 11;
        stats.total_latency_ns = 3000;
        stats.ttl_dropped = 1;
        assert_relative_eq!(stats.mean_hops(), 11.0 / 3.0);
        assert_relative_eq!(stats.mean_latency_ns(), 1000.0);
        assert_eq!(stats.dropped(), 1);
        assert_eq!(stats.in_flight(), 0);
    }
}
