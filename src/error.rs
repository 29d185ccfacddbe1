//! Crate-level error type

use thiserror::Error;

use crate::registry::RegistryError;

/// Errors surfaced by the relay outside of per-message routing
///
/// Routing itself never fails; see [`crate::router::RouteOutcome`].
#[derive(Error, Debug)]
pub enum Error {
    /// Socket-level failure (bind, accept, serve)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Participant registration was refused
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;
