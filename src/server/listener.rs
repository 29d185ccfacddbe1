//! Relay server listener
//!
//! Binds the TCP listener and serves the HTTP/WebSocket routes.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::error::Result;
use crate::registry::{Registry, RegistryConfig};
use crate::server::config::ServerConfig;
use crate::server::routes;
use crate::server::state::RelayState;
use crate::stats::RelayStats;

/// Signaling relay server
pub struct RelayServer {
    state: RelayState,
}

impl RelayServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry_config(config, RegistryConfig::default())
    }

    /// Create a new server with custom registry configuration
    pub fn with_registry_config(config: ServerConfig, registry_config: RegistryConfig) -> Self {
        let registry = Arc::new(Registry::with_config(registry_config));
        Self {
            state: RelayState::new(config, registry),
        }
    }

    /// Get a reference to the participant registry
    pub fn registry(&self) -> &Arc<Registry> {
        &self.state.registry
    }

    /// Get a reference to the relay counters
    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.state.stats
    }

    /// Build the axum app sharing this server's state
    pub fn app(&self) -> axum::Router {
        routes::app(self.state.clone())
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let listener = TcpListener::bind(self.state.config.bind_addr).await?;
        Ok(listener)
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` completes
    ///
    /// When `shutdown` fires the server stops accepting and every open session
    /// is told to close. This returns after the HTTP connections have drained
    /// and every upgraded session has unregistered and closed its socket.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Signaling relay listening");

        let state = self.state.clone();
        let signal = async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
            state.trigger_shutdown();
        };

        let served = axum::serve(listener, self.app())
            .with_graceful_shutdown(signal)
            .await;

        // Upgraded sockets are detached from their HTTP connection, so axum
        // does not wait for them
        self.state.trigger_shutdown();
        self.state.wait_for_sessions().await;
        tracing::info!("All sessions closed");

        served?;
        Ok(())
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.state.config.bind_addr
    }
}
