//! Per-participant session
//!
//! One session per accepted WebSocket. It registers the participant, reads
//! frames until the peer goes away, routes each decoded message, and always
//! unregisters and closes the socket on the way out.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitStream;
use futures::StreamExt;
use thiserror::Error;
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};

use crate::connection::Connection;
use crate::registry::RegistryError;
use crate::router::{SenderContext, SignalMessage, ERROR_TYPE, SERVER_SENDER};
use crate::server::connection::{writer_task, WsConnection};
use crate::server::state::RelayState;

/// Reasons a session ends abnormally
#[derive(Error, Debug)]
pub enum SessionError {
    /// Inbound frame was not a valid signaling message
    #[error("invalid message: {0}")]
    Decode(#[from] serde_json::Error),

    /// Binary frame did not hold UTF-8 text
    #[error("binary frame is not valid UTF-8")]
    InvalidUtf8,

    /// WebSocket read or write failed
    #[error("websocket error: {0}")]
    WebSocket(#[from] axum::Error),

    /// No frame received within the idle timeout
    #[error("idle timeout")]
    IdleTimeout,

    /// A socket write did not complete in time
    #[error("write timeout")]
    WriteTimeout,
}

/// A registered participant's connection lifecycle
pub(crate) struct Session {
    session_id: u64,
    id: String,
    role: String,
    state: RelayState,
}

impl Session {
    pub(crate) fn new(session_id: u64, id: String, role: String, state: RelayState) -> Self {
        Self {
            session_id,
            id,
            role,
            state,
        }
    }

    /// Run the session to completion
    pub(crate) async fn run(self, socket: WebSocket) {
        let config = Arc::clone(&self.state.config);
        let (sink, stream) = socket.split();
        let (tx, rx) = mpsc::channel(config.send_queue_capacity);
        let close = Arc::new(Notify::new());
        let connection = Arc::new(WsConnection::new(self.session_id, tx, Arc::clone(&close)));

        let writer = tokio::spawn(writer_task(
            self.session_id,
            sink,
            rx,
            config.write_timeout,
            Arc::clone(&close),
        ));

        match self
            .state
            .registry
            .register(self.id.as_str(), self.role.as_str(), connection.clone())
            .await
        {
            Ok(Some(superseded)) => superseded.close(),
            Ok(None) => {}
            Err(e) => {
                self.reject(&connection, &e);
                drop(connection);
                let _ = writer.await;
                return;
            }
        }

        self.state.stats.record_connection_accepted();
        tracing::info!(
            session_id = self.session_id,
            id = %self.id,
            role = %self.role,
            "Participant connected"
        );

        // The read loop runs in its own task so cleanup below also runs when
        // it panics.
        let reader = {
            let connection = Arc::clone(&connection);
            let state = self.state.clone();
            let id = self.id.clone();
            let role = self.role.clone();
            tokio::spawn(async move { read_loop(stream, &state, &id, &role, &connection, &close).await })
        };

        match reader.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(
                session_id = self.session_id,
                id = %self.id,
                error = %e,
                "Session error"
            ),
            Err(e) => tracing::error!(
                session_id = self.session_id,
                id = %self.id,
                error = %e,
                "Session task failed"
            ),
        }

        self.state
            .registry
            .unregister_session(&self.id, self.session_id)
            .await;

        // Dropping the last sender lets the writer drain and close the socket.
        drop(connection);
        let writer_abort = writer.abort_handle();
        if tokio::time::timeout(config.write_timeout, writer).await.is_err() {
            writer_abort.abort();
        }

        tracing::info!(session_id = self.session_id, id = %self.id, "Participant disconnected");
    }

    fn reject(&self, connection: &WsConnection, error: &RegistryError) {
        self.state.stats.record_connection_rejected();
        tracing::warn!(
            session_id = self.session_id,
            id = %self.id,
            error = %error,
            "Registration refused"
        );

        let reply = SignalMessage::new(ERROR_TYPE)
            .from(SERVER_SENDER)
            .to(self.id.as_str())
            .with_payload(serde_json::Value::String(error.to_string()));
        let _ = connection.send(&reply);
    }
}

async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    state: &RelayState,
    id: &str,
    role: &str,
    connection: &WsConnection,
    close: &Notify,
) -> Result<(), SessionError> {
    let config = &state.config;
    let mut shutdown = state.shutdown_signal();
    let mut last_seen = Instant::now();
    let idle_limit = config.idle_limit();

    let mut ping = config.ping_period().map(|period| {
        let mut ping = interval_at(Instant::now() + period, period);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ping
    });

    loop {
        tokio::select! {
            _ = close.notified() => {
                tracing::debug!(id = %id, "Connection closed by relay");
                return Ok(());
            }
            _ = shutdown_requested(&mut shutdown) => {
                return Ok(());
            }
            _ = idle_expired(last_seen, idle_limit) => {
                return Err(SessionError::IdleTimeout);
            }
            _ = next_ping(&mut ping) => {
                if let Err(e) = connection.ping() {
                    tracing::debug!(id = %id, error = %e, "Ping not queued");
                }
            }
            frame = stream.next() => {
                last_seen = Instant::now();

                let text = match frame {
                    None => return Ok(()),
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Binary(data))) => {
                        String::from_utf8(data).map_err(|_| SessionError::InvalidUtf8)?
                    }
                    Some(Ok(Message::Close(_))) => return Ok(()),
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                };

                let message: SignalMessage = text.parse()?;
                let sender = SenderContext {
                    id,
                    role,
                    connection,
                };
                state.router.route(&sender, message).await;
            }
        }
    }
}

/// Resolves once shutdown is signalled; the watch guard is dropped before
/// returning so the read loop stays `Send`.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn idle_expired(last_seen: Instant, limit: Option<Duration>) {
    match limit {
        Some(limit) => sleep_until(last_seen + limit).await,
        None => std::future::pending().await,
    }
}

async fn next_ping(ping: &mut Option<Interval>) {
    match ping {
        Some(ping) => {
            ping.tick().await;
        }
        None => std::future::pending().await,
    }
}
