//! WebSocket transport for the relay
//!
//! Accepts participant connections, runs one session per connection and
//! serves the listing endpoint. Everything here is plumbing around
//! [`crate::registry`] and [`crate::router`].

pub mod config;
pub mod connection;
pub mod listener;
pub mod routes;
pub mod session;
pub mod state;

pub use config::ServerConfig;
pub use connection::WsConnection;
pub use listener::RelayServer;
pub use session::SessionError;
pub use state::RelayState;
