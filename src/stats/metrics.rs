//! Statistics for the relay

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Relay-wide counters
///
/// Updated lock-free from every session; read via [`RelayStats::snapshot`].
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    connections_accepted: AtomicU64,
    connections_rejected: AtomicU64,
    messages_routed: AtomicU64,
    direct_delivered: AtomicU64,
    broadcast_delivered: AtomicU64,
    broadcast_filtered: AtomicU64,
    routing_misses: AtomicU64,
    delivery_failures: AtomicU64,
}

impl RelayStats {
    /// Create a zeroed stats tracker
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            connections_accepted: AtomicU64::new(0),
            connections_rejected: AtomicU64::new(0),
            messages_routed: AtomicU64::new(0),
            direct_delivered: AtomicU64::new(0),
            broadcast_delivered: AtomicU64::new(0),
            broadcast_filtered: AtomicU64::new(0),
            routing_misses: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_connection_accepted(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_connection_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_routed(&self) {
        self.messages_routed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_direct_delivered(&self) {
        self.direct_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_broadcast(&self, delivered: usize, filtered: usize) {
        self.broadcast_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.broadcast_filtered
            .fetch_add(filtered as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.routing_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivery_failures(&self, count: usize) {
        self.delivery_failures
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime: self.started_at.elapsed(),
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            messages_routed: self.messages_routed.load(Ordering::Relaxed),
            direct_delivered: self.direct_delivered.load(Ordering::Relaxed),
            broadcast_delivered: self.broadcast_delivered.load(Ordering::Relaxed),
            broadcast_filtered: self.broadcast_filtered.load(Ordering::Relaxed),
            routing_misses: self.routing_misses.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`RelayStats`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsSnapshot {
    /// Time since the stats tracker was created
    #[serde(serialize_with = "as_secs")]
    pub uptime: Duration,
    /// WebSocket sessions that completed registration
    pub connections_accepted: u64,
    /// Connection attempts refused (missing id, limit, duplicate id)
    pub connections_rejected: u64,
    /// Inbound messages handed to the router
    pub messages_routed: u64,
    /// Direct messages queued for their target
    pub direct_delivered: u64,
    /// Broadcast copies queued across all recipients
    pub broadcast_delivered: u64,
    /// Broadcast recipients skipped by the role filter
    pub broadcast_filtered: u64,
    /// Direct messages whose target was not connected
    pub routing_misses: u64,
    /// Sends that failed (queue full or connection closed)
    pub delivery_failures: u64,
}

fn as_secs<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = RelayStats::new();

        stats.record_routed();
        stats.record_routed();
        stats.record_direct_delivered();
        stats.record_broadcast(3, 1);
        stats.record_miss();
        stats.record_delivery_failures(2);
        stats.record_connection_accepted();
        stats.record_connection_rejected();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.messages_routed, 2);
        assert_eq!(snapshot.direct_delivered, 1);
        assert_eq!(snapshot.broadcast_delivered, 3);
        assert_eq!(snapshot.broadcast_filtered, 1);
        assert_eq!(snapshot.routing_misses, 1);
        assert_eq!(snapshot.delivery_failures, 2);
        assert_eq!(snapshot.connections_accepted, 1);
        assert_eq!(snapshot.connections_rejected, 1);
    }

    #[test]
    fn test_snapshot_serializes_uptime_as_seconds() {
        let snapshot = StatsSnapshot {
            uptime: Duration::from_millis(2500),
            ..Default::default()
        };

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["uptime"], 2);
        assert_eq!(value["messages_routed"], 0);
    }
}
