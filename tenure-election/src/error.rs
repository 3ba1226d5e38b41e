//! Error types for leader election

use tenure_store::{SessionId, StoreError};
use thiserror::Error;

/// Leader election errors
///
/// Losing an election is not an error; it is reported through
/// [`ElectionOutcome::Lost`](crate::ElectionOutcome::Lost).
#[derive(Debug, Error)]
pub enum ElectionError {
    /// A collaborator call failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Service names must be non-empty
    #[error("Invalid service name: {0:?}")]
    InvalidServiceName(String),

    /// Strict release policy and no session was presented
    #[error("Releasing leadership of {0} requires the holding session")]
    OwnershipRequired(String),

    /// The presented session does not hold the key
    #[error("Session {session} does not hold leadership for {service}")]
    NotLeader {
        /// Service name
        service: String,
        /// Session presented by the caller
        session: SessionId,
    },
}

/// Result type for election operations
pub type ElectionResult<T> = std::result::Result<T, ElectionError>;
