//! Participant registry
//!
//! The registry tracks which participants are connected and how to reach
//! them. It is shared as an `Arc<Registry>` between the transport sessions,
//! which register and unregister, and the router, which looks up and fans out.
//!
//! # Architecture
//!
//! ```text
//!                           Arc<Registry>
//!                     ┌─────────────────────────┐
//!                     │ participants: HashMap<  │
//!                     │   id, ParticipantEntry {│
//!                     │     role,               │
//!                     │     connection,         │
//!                     │   }                     │
//!                     │ >                       │
//!                     └───────────┬─────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Session A]             [Session B]             [Session C]
//!    register()              router.route()          unregister()
//!                                 │
//!                                 └──► conn.send() ──► writer task ──► WebSocket
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod store;

pub use config::{DuplicateIdPolicy, RegistryConfig};
pub use entry::{ParticipantEntry, ParticipantInfo};
pub use error::RegistryError;
pub use store::{Participants, Registry};
