//! WebRTC signaling relay
//!
//! Peers that want to open a direct WebRTC connection first need to trade
//! offers, answers and ICE candidates. This crate relays those messages over
//! WebSocket through a central rendezvous point.
//!
//! # Protocol
//!
//! - **GET /ws?id={id}&role={role}**: connect as participant `id`
//! - **GET /list**: `[{"id": "...", "role": "..."}]`
//! - **GET /health**, **GET /stats**
//!
//! Each WebSocket text frame is one message:
//!
//! ```json
//! {"type": "offer", "from": "alice", "to": "bob", "payload": {...}}
//! ```
//!
//! - `to` set: delivered to that participant only, or answered with
//!   `{"type":"error","from":"server","to":"<you>","payload":"target <to> not found"}`
//! - `to` empty: delivered to everyone else, except participants whose role
//!   equals the sender's when both have a role
//! - `from` empty: filled with the sender's id
//!
//! # Example
//!
//! ```no_run
//! use signal_relay::{RelayServer, ServerConfig};
//!
//! # async fn run() -> signal_relay::Result<()> {
//! let server = RelayServer::new(ServerConfig::default());
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod connection;
pub mod error;
pub mod registry;
pub mod router;
pub mod server;
pub mod stats;

pub use connection::{Connection, SendError};
pub use error::{Error, Result};
pub use registry::{DuplicateIdPolicy, ParticipantInfo, Registry, RegistryConfig, RegistryError};
pub use router::{RouteOutcome, Router, SenderContext, SignalMessage};
pub use server::{RelayServer, ServerConfig};
pub use stats::{RelayStats, StatsSnapshot};
