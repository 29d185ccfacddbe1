//! Shared server state handed to every route and session

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio_util::task::TaskTracker;

use crate::registry::Registry;
use crate::router::Router;
use crate::server::config::ServerConfig;
use crate::stats::RelayStats;

/// State shared by the HTTP routes and the per-connection sessions
#[derive(Clone)]
pub struct RelayState {
    /// Participant registry
    pub registry: Arc<Registry>,
    /// Message router over `registry`
    pub router: Arc<Router>,
    /// Relay counters
    pub stats: Arc<RelayStats>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
    next_session_id: Arc<AtomicU64>,
    connection_semaphore: Option<Arc<Semaphore>>,
    shutdown: Arc<watch::Sender<bool>>,
    sessions: TaskTracker,
}

impl RelayState {
    pub(crate) fn new(config: ServerConfig, registry: Arc<Registry>) -> Self {
        let stats = Arc::new(RelayStats::new());
        let router = Arc::new(Router::with_stats(Arc::clone(&registry), Arc::clone(&stats)));

        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let (shutdown, _) = watch::channel(false);

        Self {
            registry,
            router,
            stats,
            config: Arc::new(config),
            next_session_id: Arc::new(AtomicU64::new(1)),
            connection_semaphore,
            shutdown: Arc::new(shutdown),
            sessions: TaskTracker::new(),
        }
    }

    /// Allocate a session id
    pub(crate) fn next_session_id(&self) -> u64 {
        self.next_session_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Reserve a connection slot
    ///
    /// `Ok(None)` when connections are unlimited, `Err(())` when the limit is
    /// reached.
    pub(crate) fn try_acquire_slot(&self) -> Result<Option<OwnedSemaphorePermit>, ()> {
        match self.connection_semaphore {
            Some(ref sem) => sem.clone().try_acquire_owned().map(Some).map_err(|_| ()),
            None => Ok(None),
        }
    }

    /// Subscribe to the shutdown signal
    pub(crate) fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Tell every session to close
    pub(crate) fn trigger_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Tracker holding every upgraded session
    pub(crate) fn sessions(&self) -> &TaskTracker {
        &self.sessions
    }

    /// Wait until every tracked session has finished
    pub(crate) async fn wait_for_sessions(&self) {
        self.sessions.close();
        self.sessions.wait().await;
    }
}
