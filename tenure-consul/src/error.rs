//! Consul client error types.

use tenure_store::StoreError;
use thiserror::Error;

/// Result type for Consul operations.
pub type Result<T> = std::result::Result<T, ConsulError>;

/// Consul client errors.
#[derive(Debug, Error)]
pub enum ConsulError {
    /// Consul answered with a non-success status.
    #[error("Consul error: {status} - {message}")]
    Response {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// Response body could not be decoded.
    #[error("Failed to decode Consul response: {0}")]
    Decode(String),

    /// Invalid agent address.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Key that cannot be addressed over the HTTP API.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Underlying HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl ConsulError {
    /// Check if Consul rejected the request because the session is gone.
    pub fn is_invalid_session(&self) -> bool {
        match self {
            Self::Response { status, message } => {
                *status == 500 && message.to_lowercase().contains("invalid session")
            }
            _ => false,
        }
    }

    /// Get the HTTP status code if there is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<ConsulError> for StoreError {
    fn from(err: ConsulError) -> Self {
        if err.is_invalid_session() {
            if let ConsulError::Response { message, .. } = err {
                return StoreError::InvalidSession(message);
            }
        }

        match err {
            ConsulError::Decode(message) => StoreError::Decode(message),
            ConsulError::Http(e) if e.is_connect() || e.is_timeout() => {
                StoreError::Unavailable(e.to_string())
            }
            other => StoreError::backend(other),
        }
    }
}
