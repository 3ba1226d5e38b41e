//! Store error types.

use thiserror::Error;

/// Result type for collaborator operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by a session provider or key-value store.
///
/// Contention is never an error: a lock held by someone else is reported
/// as `Ok(false)` by [`KeyValueStore::acquire_lock`](crate::KeyValueStore::acquire_lock).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The session does not exist or has been invalidated.
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// The backend could not be reached or refused the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with something we could not interpret.
    #[error("Failed to decode store response: {0}")]
    Decode(String),

    /// Backend-specific failure.
    #[error("Store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wrap a backend error.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }

    /// Check if this error means the session is gone.
    pub fn is_invalid_session(&self) -> bool {
        matches!(self, Self::InvalidSession(_))
    }
}
