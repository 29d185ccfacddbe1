//! Participant registry implementation
//!
//! The authoritative map of which participants are reachable and through
//! which connection.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};

use super::config::{DuplicateIdPolicy, RegistryConfig};
use super::entry::{ParticipantEntry, ParticipantInfo};
use super::error::RegistryError;
use crate::connection::Connection;

/// Central registry for all connected participants
///
/// Thread-safe via a single `RwLock`. Lookups, snapshots and broadcast
/// iteration share the read side; register and unregister take the write side
/// and so are exclusive with everything else.
pub struct Registry {
    /// Map of participant id to its entry
    participants: RwLock<HashMap<String, ParticipantEntry>>,

    /// Configuration
    config: RegistryConfig,
}

impl Registry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            participants: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a participant
    ///
    /// With [`DuplicateIdPolicy::Replace`] an existing entry for `id` is
    /// replaced and its connection is returned so the caller can close it. The
    /// registry never closes connections itself.
    pub async fn register(
        &self,
        id: impl Into<String>,
        role: impl Into<String>,
        connection: Arc<dyn Connection>,
    ) -> Result<Option<Arc<dyn Connection>>, RegistryError> {
        let id = id.into();
        let role = role.into();

        if id.is_empty() {
            return Err(RegistryError::EmptyId);
        }

        let session_id = connection.session_id();
        let mut participants = self.participants.write().await;

        if self.config.duplicate_policy == DuplicateIdPolicy::Reject
            && participants.contains_key(&id)
        {
            tracing::warn!(
                id = %id,
                session_id = session_id,
                "Registration rejected: id already in use"
            );
            return Err(RegistryError::DuplicateId(id));
        }

        let previous = participants.insert(id.clone(), ParticipantEntry::new(role.clone(), connection));

        match &previous {
            Some(old) => tracing::info!(
                id = %id,
                role = %role,
                session_id = session_id,
                superseded_session = old.session_id(),
                participants = participants.len(),
                "Participant re-registered"
            ),
            None => tracing::info!(
                id = %id,
                role = %role,
                session_id = session_id,
                participants = participants.len(),
                "Participant registered"
            ),
        }

        Ok(previous.map(|entry| entry.connection))
    }

    /// Unregister a participant
    ///
    /// Absent ids are ignored. Returns whether an entry was removed.
    pub async fn unregister(&self, id: &str) -> bool {
        let mut participants = self.participants.write().await;
        let removed = participants.remove(id).is_some();

        if removed {
            tracing::info!(id = %id, participants = participants.len(), "Participant unregistered");
        }

        removed
    }

    /// Unregister a participant only if `session_id` still owns the entry
    ///
    /// A session that was superseded by a newer registration under the same
    /// id leaves the newer entry alone.
    pub async fn unregister_session(&self, id: &str, session_id: u64) -> bool {
        let mut participants = self.participants.write().await;

        match participants.get(id) {
            Some(entry) if entry.session_id() == session_id => {
                participants.remove(id);
                tracing::info!(
                    id = %id,
                    session_id = session_id,
                    participants = participants.len(),
                    "Participant unregistered"
                );
                true
            }
            Some(entry) => {
                tracing::warn!(
                    id = %id,
                    expected = entry.session_id(),
                    actual = session_id,
                    "Unregister skipped: session no longer owns id"
                );
                false
            }
            None => false,
        }
    }

    /// Look up the live connection for a participant
    pub async fn lookup(&self, id: &str) -> Option<Arc<dyn Connection>> {
        let participants = self.participants.read().await;
        participants.get(id).map(|entry| Arc::clone(&entry.connection))
    }

    /// Look up the role of a participant
    pub async fn role_of(&self, id: &str) -> Option<String> {
        let participants = self.participants.read().await;
        participants.get(id).map(|entry| entry.role.clone())
    }

    /// Copy out every registered participant, ordered by id
    pub async fn snapshot(&self) -> Vec<ParticipantInfo> {
        let participants = self.participants.read().await;

        let mut list: Vec<ParticipantInfo> = participants
            .iter()
            .map(|(id, entry)| ParticipantInfo {
                id: id.clone(),
                role: entry.role.clone(),
            })
            .collect();
        drop(participants);

        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    /// Hold the read lock and iterate the live participants
    ///
    /// Registrations and unregistrations wait until the returned guard is
    /// dropped.
    pub async fn participants(&self) -> Participants<'_> {
        Participants {
            guard: self.participants.read().await,
        }
    }

    /// Number of registered participants
    pub async fn len(&self) -> usize {
        self.participants.read().await.len()
    }

    /// Whether no participant is registered
    pub async fn is_empty(&self) -> bool {
        self.participants.read().await.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-locked view of the registry
pub struct Participants<'a> {
    guard: RwLockReadGuard<'a, HashMap<String, ParticipantEntry>>,
}

impl Participants<'_> {
    /// Iterate `(id, entry)` pairs in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParticipantEntry)> {
        self.guard.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    /// Get a single entry
    pub fn get(&self, id: &str) -> Option<&ParticipantEntry> {
        self.guard.get(id)
    }

    /// Number of participants
    pub fn len(&self) -> usize {
        self.guard.len()
    }

    /// Whether there are no participants
    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::connection::testing::RecordingConnection;

    fn conn(session_id: u64) -> Arc<RecordingConnection> {
        Arc::new(RecordingConnection::new(session_id))
    }

    #[tokio::test]
    async fn test_register_lookup() {
        let registry = Registry::new();

        let previous = assert_ok!(registry.register("alice", "caller", conn(1)).await);
        assert!(previous.is_none());

        let found = registry.lookup("alice").await.unwrap();
        assert_eq!(found.session_id(), 1);
        assert_eq!(registry.role_of("alice").await.as_deref(), Some("caller"));
        assert!(registry.lookup("bob").await.is_none());
    }

    #[tokio::test]
    async fn test_register_empty_id() {
        let registry = Registry::new();

        let err = assert_err!(registry.register("", "caller", conn(1)).await);
        assert_eq!(err, RegistryError::EmptyId);
        assert!(registry.is_empty().await);
        assert!(registry.participants().await.is_empty());
    }

    #[tokio::test]
    async fn test_disjoint_register_unregister_sequence() {
        let registry = Registry::new();

        registry.register("a", "", conn(1)).await.unwrap();
        registry.register("b", "", conn(2)).await.unwrap();
        registry.register("c", "", conn(3)).await.unwrap();
        assert!(registry.unregister("b").await);
        registry.register("d", "", conn(4)).await.unwrap();
        assert!(registry.unregister("a").await);

        assert!(registry.lookup("a").await.is_none());
        assert!(registry.lookup("b").await.is_none());
        assert!(registry.lookup("c").await.is_some());
        assert!(registry.lookup("d").await.is_some());
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_reregister_replaces() {
        let registry = Registry::new();
        let old = conn(1);

        registry.register("alice", "caller", old.clone()).await.unwrap();
        let superseded = registry
            .register("alice", "callee", conn(2))
            .await
            .unwrap()
            .expect("previous connection returned");

        assert_eq!(superseded.session_id(), 1);
        // Registry hands the old connection back but does not close it
        assert!(!old.is_closed());

        let found = registry.lookup("alice").await.unwrap();
        assert_eq!(found.session_id(), 2);
        assert_eq!(registry.role_of("alice").await.as_deref(), Some("callee"));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_reject_policy() {
        let config = RegistryConfig::default().duplicate_policy(DuplicateIdPolicy::Reject);
        let registry = Registry::with_config(config);

        registry.register("alice", "caller", conn(1)).await.unwrap();
        let err = assert_err!(registry.register("alice", "callee", conn(2)).await);
        assert_eq!(err, RegistryError::DuplicateId("alice".into()));
        assert_eq!(
            format!("{:?}", registry.lookup("alice").await),
            "Some(Connection { session_id: 1 })"
        );

        let found = registry.lookup("alice").await.unwrap();
        assert_eq!(found.session_id(), 1);
        assert_eq!(registry.role_of("alice").await.as_deref(), Some("caller"));
    }

    #[tokio::test]
    async fn test_unregister_absent_is_noop() {
        let registry = Registry::new();
        assert!(!registry.unregister("ghost").await);

        registry.register("alice", "", conn(1)).await.unwrap();
        assert!(registry.unregister("alice").await);
        assert!(!registry.unregister("alice").await);
    }

    #[tokio::test]
    async fn test_unregister_session_mismatch() {
        let registry = Registry::new();

        registry.register("alice", "", conn(1)).await.unwrap();
        registry.register("alice", "", conn(2)).await.unwrap();

        // The superseded session exits
        assert!(!registry.unregister_session("alice", 1).await);
        assert_eq!(registry.lookup("alice").await.unwrap().session_id(), 2);

        assert!(registry.unregister_session("alice", 2).await);
        assert!(registry.lookup("alice").await.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_sorted_copy() {
        let registry = Registry::new();

        registry.register("carol", "callee", conn(3)).await.unwrap();
        registry.register("alice", "caller", conn(1)).await.unwrap();
        registry.register("bob", "", conn(2)).await.unwrap();

        let snapshot = registry.snapshot().await;
        let ids: Vec<&str> = snapshot.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["alice", "bob", "carol"]);
        assert_eq!(snapshot[0].role, "caller");
        assert_eq!(snapshot[1].role, "");

        // Copy-out: later changes do not affect an existing snapshot
        registry.unregister("bob").await;
        assert_eq!(snapshot.len(), 3);

        let snapshot = registry.snapshot().await;
        assert!(snapshot.iter().all(|p| p.id != "bob"));
    }

    #[tokio::test]
    async fn test_participants_guard_blocks_writers() {
        let registry = Arc::new(Registry::new());
        registry.register("alice", "", conn(1)).await.unwrap();

        let guard = registry.participants().await;
        assert_eq!(guard.len(), 1);
        assert!(!guard.is_empty());

        let writer = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.register("bob", "", conn(2)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!writer.is_finished());
        assert!(guard.get("bob").is_none());

        drop(guard);
        writer.await.unwrap().unwrap();
        assert!(registry.lookup("bob").await.is_some());
    }
}
