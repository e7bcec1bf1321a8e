// Error taxonomy for store operations

use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the entity stores.
///
/// `NotFound` and `Conflict` are application-level outcomes callers are
/// expected to match on; `Backend` and `Serialization` are infrastructure
/// failures that always propagate rather than being masked as empty results.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity absent at the addressed key, or an index lookup came back empty
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness or state-transition precondition failed
    #[error("conflict: {0}")]
    Conflict(String),

    /// The underlying store call itself failed (network, throttling, ...)
    #[error("backend error: {0}")]
    Backend(String),

    /// A record failed to encode or decode
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        StoreError::NotFound(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        StoreError::Conflict(msg.into())
    }

    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        StoreError::Backend(msg.into())
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        StoreError::Serialization(msg.into())
    }

    /// HTTP status code for HTTP-fronted deployments
    pub fn http_status(&self) -> u16 {
        match self {
            StoreError::NotFound(_) => 404,
            StoreError::Conflict(_) => 409,
            StoreError::Backend(_) | StoreError::Serialization(_) => 500,
        }
    }
}
