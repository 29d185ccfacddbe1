//! Registry error types
//!
//! Error types for participant registration.

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Participant id was empty
    EmptyId,
    /// Id is already registered and the registry rejects collisions
    DuplicateId(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::EmptyId => write!(f, "missing id"),
            RegistryError::DuplicateId(id) => write!(f, "id already registered: {}", id),
        }
    }
}

impl std::error::Error for RegistryError {}
