//! Collaborator traits consumed by the election coordinator.

use crate::error::StoreResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque session identifier issued by a [`SessionProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the raw identifier.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A value read from the key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvValue {
    /// Key the value was read from
    pub key: String,

    /// Stored content (a key may exist with no body)
    pub content: Option<String>,

    /// Session currently holding the key, if any
    pub session: Option<SessionId>,

    /// Number of times the key has been acquired
    pub lock_index: u64,
}

impl KvValue {
    /// Create an unbound value.
    pub fn new(key: impl Into<String>, content: Option<String>) -> Self {
        Self {
            key: key.into(),
            content,
            session: None,
            lock_index: 0,
        }
    }

    /// Set the holding session.
    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = Some(session);
        self
    }

    /// Set the lock index.
    pub fn with_lock_index(mut self, lock_index: u64) -> Self {
        self.lock_index = lock_index;
        self
    }

    /// Whether some session currently holds the key.
    pub fn is_locked(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the key is held by `session`.
    pub fn is_held_by(&self, session: &SessionId) -> bool {
        self.session.as_ref() == Some(session)
    }
}

/// Issues liveness-bound session tokens.
///
/// A session stays valid until its owner stops renewing it or destroys it.
/// Destroying a session releases every key bound to it.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Create a new session named `name`.
    ///
    /// The name is informational only.
    async fn create_session(&self, name: &str) -> StoreResult<SessionId>;

    /// Destroy a session.
    ///
    /// Returns `true` if the provider accepted the request.
    async fn destroy_session(&self, session: &SessionId) -> StoreResult<bool>;
}

/// Linearizable per-key store with session-bound locks.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a key.
    async fn get_value(&self, key: &str) -> StoreResult<Option<KvValue>>;

    /// Write `content` to `key` and bind it to `session`, only if no other
    /// session currently holds it.
    ///
    /// This must be a single atomic operation on the backend. Returns `true`
    /// iff `session` now holds the key.
    async fn acquire_lock(&self, key: &str, content: &str, session: &SessionId)
    -> StoreResult<bool>;

    /// Unbind `key` if it is bound to `session`. Content is left in place.
    async fn release_lock(&self, key: &str, session: &SessionId) -> StoreResult<bool>;
}
