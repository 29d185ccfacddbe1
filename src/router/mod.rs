//! Message routing
//!
//! Every inbound message is either delivered to one named participant
//! (`to` set), answered with an error reply when that participant is not
//! connected, or fanned out to everyone else subject to the role filter.
//!
//! Routing never fails. Send failures are logged and counted; they are not
//! reported to the sender and do not unregister the recipient, since its own
//! session notices a dead socket on its next read.

pub mod message;

use std::sync::Arc;

pub use message::{SignalMessage, ERROR_TYPE, SERVER_SENDER};

use crate::connection::Connection;
use crate::registry::Registry;
use crate::stats::RelayStats;

/// The participant a message came from
pub struct SenderContext<'a> {
    /// Sender id as registered
    pub id: &'a str,
    /// Sender role (may be empty)
    pub role: &'a str,
    /// The sender's own connection, used for error replies
    pub connection: &'a dyn Connection,
}

/// What happened to a routed message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Direct message queued for its target
    Delivered,
    /// Direct message target was found but the send failed
    DeliveryFailed,
    /// Direct message target was not connected; the sender got an error reply
    TargetNotFound,
    /// Broadcast fan-out finished
    Broadcast {
        /// Recipients the message was queued for
        delivered: usize,
        /// Recipients skipped by the role filter
        filtered: usize,
        /// Recipients whose send failed
        failed: usize,
    },
}

/// Whether a broadcast from `sender_role` should reach `recipient_role`
///
/// Same-role forwarding is suppressed only when both roles are set.
pub fn roles_compatible(sender_role: &str, recipient_role: &str) -> bool {
    sender_role.is_empty() || recipient_role.is_empty() || sender_role != recipient_role
}

/// Routes messages between registered participants
pub struct Router {
    registry: Arc<Registry>,
    stats: Arc<RelayStats>,
}

impl Router {
    /// Create a router over the given registry
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_stats(registry, Arc::new(RelayStats::new()))
    }

    /// Create a router that records into an existing stats tracker
    pub fn with_stats(registry: Arc<Registry>, stats: Arc<RelayStats>) -> Self {
        Self { registry, stats }
    }

    /// Get the registry this router reads from
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Get the stats tracker
    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// Route one inbound message from `sender`
    pub async fn route(&self, sender: &SenderContext<'_>, mut message: SignalMessage) -> RouteOutcome {
        if message.from.is_empty() {
            message.from = sender.id.to_owned();
        }

        self.stats.record_routed();

        if message.is_direct() {
            self.route_direct(sender, &message).await
        } else {
            self.broadcast(sender, &message).await
        }
    }

    async fn route_direct(&self, sender: &SenderContext<'_>, message: &SignalMessage) -> RouteOutcome {
        let Some(target) = self.registry.lookup(&message.to).await else {
            self.stats.record_miss();
            tracing::debug!(
                from = %sender.id,
                to = %message.to,
                kind = %message.kind,
                "Target not found, replying with error"
            );

            let reply = SignalMessage::target_not_found(sender.id, &message.to);
            if let Err(e) = sender.connection.send(&reply) {
                tracing::warn!(id = %sender.id, error = %e, "Failed to send error reply");
            }
            return RouteOutcome::TargetNotFound;
        };

        match target.send(message) {
            Ok(()) => {
                self.stats.record_direct_delivered();
                tracing::debug!(
                    from = %message.from,
                    to = %message.to,
                    kind = %message.kind,
                    "Message forwarded"
                );
                RouteOutcome::Delivered
            }
            Err(e) => {
                self.stats.record_delivery_failures(1);
                tracing::warn!(to = %message.to, error = %e, "Forward failed");
                RouteOutcome::DeliveryFailed
            }
        }
    }

    async fn broadcast(&self, sender: &SenderContext<'_>, message: &SignalMessage) -> RouteOutcome {
        let mut delivered = 0;
        let mut filtered = 0;
        let mut failed = 0;

        // Read lock held for the whole loop: nobody unregistered mid-broadcast
        // is reached, and registrations wait until the fan-out is done.
        let participants = self.registry.participants().await;

        for (id, entry) in participants.iter() {
            if id == sender.id {
                continue;
            }
            if !roles_compatible(sender.role, &entry.role) {
                filtered += 1;
                continue;
            }

            match entry.connection.send(message) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(to = %id, error = %e, "Broadcast delivery failed");
                }
            }
        }
        drop(participants);

        self.stats.record_broadcast(delivered, filtered);
        if failed > 0 {
            self.stats.record_delivery_failures(failed);
        }

        tracing::debug!(
            from = %message.from,
            kind = %message.kind,
            delivered = delivered,
            filtered = filtered,
            failed = failed,
            "Message broadcast"
        );

        RouteOutcome::Broadcast {
            delivered,
            filtered,
            failed,
        }
    }
}
