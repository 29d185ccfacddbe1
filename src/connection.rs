//! Connection capability
//!
//! The registry and router never touch a socket. They hold an
//! `Arc<dyn Connection>` supplied by the transport and only ever ask it to
//! queue a message or to shut down.

use thiserror::Error;

use crate::router::SignalMessage;

/// Failure to hand a message to a connection
#[derive(Error, Debug)]
pub enum SendError {
    /// The connection's outbound queue is full (slow or stalled reader)
    #[error("outbound queue full")]
    QueueFull,

    /// The connection is already closed
    #[error("connection closed")]
    Closed,

    /// The message could not be serialized
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A live participant connection
///
/// Implementations must make `send` safe to call from many tasks at once and
/// must deliver messages from one caller in the order they were sent.
pub trait Connection: Send + Sync {
    /// Session that owns this connection
    fn session_id(&self) -> u64;

    /// Queue a message for delivery
    ///
    /// Fire-and-forget: `Ok` means the message was accepted for writing, not
    /// that the remote peer received it.
    fn send(&self, message: &SignalMessage) -> Result<(), SendError>;

    /// Ask the owning session to shut the connection down
    fn close(&self);
}

impl std::fmt::Debug for dyn Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session_id", &self.session_id())
            .finish()
    }
}
