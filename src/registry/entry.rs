//! Participant entry types
//!
//! This module defines the per-participant state stored in the registry.

use std::sync::Arc;

use serde::Serialize;

use crate::connection::Connection;

/// Entry for a single participant in the registry
///
/// Role and connection live in the same entry so an id can never have one
/// without the other.
pub struct ParticipantEntry {
    /// Classification tag; empty means unspecified
    pub role: String,

    /// Live connection handle (owned by the transport session)
    pub connection: Arc<dyn Connection>,
}

impl ParticipantEntry {
    pub(super) fn new(role: String, connection: Arc<dyn Connection>) -> Self {
        Self { role, connection }
    }

    /// Session that owns this registration
    pub fn session_id(&self) -> u64 {
        self.connection.session_id()
    }
}

impl std::fmt::Debug for ParticipantEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticipantEntry")
            .field("role", &self.role)
            .field("session_id", &self.session_id())
            .finish()
    }
}

/// Point-in-time view of one participant, as served by the listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantInfo {
    /// Participant id
    pub id: String,
    /// Participant role (may be empty)
    pub role: String,
}
