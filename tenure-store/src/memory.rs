//! In-memory session provider and key-value store (for testing/embedding)

use crate::error::{StoreError, StoreResult};
use crate::traits::{KeyValueStore, KvValue, SessionId, SessionProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    content: Option<String>,
    session: Option<SessionId>,
    lock_index: u64,
}

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<SessionId, String>,
    entries: HashMap<String, Entry>,
}

impl Inner {
    /// Drop a session and unbind everything it holds.
    fn remove_session(&mut self, session: &SessionId) -> bool {
        if self.sessions.remove(session).is_none() {
            return false;
        }

        for entry in self.entries.values_mut() {
            if entry.session.as_ref() == Some(session) {
                entry.session = None;
            }
        }

        true
    }
}

/// In-memory backend implementing both [`SessionProvider`] and [`KeyValueStore`].
///
/// Sessions and keys live behind one lock, so `acquire_lock` is a single
/// critical section. Clones share state.
///
/// `release_lock` on a key that is unbound, or bound to another session,
/// returns `false`.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate a session as if it had expired.
    ///
    /// Every key bound to it becomes unbound; content is kept.
    pub async fn invalidate_session(&self, session: &SessionId) -> bool {
        let removed = self.inner.write().await.remove_session(session);
        if removed {
            debug!("Invalidated session {}", session);
        }
        removed
    }

    /// Whether a session is currently valid.
    pub async fn session_exists(&self, session: &SessionId) -> bool {
        self.inner.read().await.sessions.contains_key(session)
    }

    /// Name a session was created with.
    pub async fn session_name(&self, session: &SessionId) -> Option<String> {
        self.inner.read().await.sessions.get(session).cloned()
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    /// Number of stored keys.
    pub async fn key_count(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Drop all sessions and keys.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.sessions.clear();
        inner.entries.clear();
    }
}

#[async_trait]
impl SessionProvider for InMemoryStore {
    async fn create_session(&self, name: &str) -> StoreResult<SessionId> {
        let session = SessionId::generate();
        self.inner
            .write()
            .await
            .sessions
            .insert(session.clone(), name.to_string());

        debug!("Created session {} ({})", session, name);
        Ok(session)
    }

    async fn destroy_session(&self, session: &SessionId) -> StoreResult<bool> {
        // Destroying an unknown session is accepted, as Consul does.
        self.invalidate_session(session).await;
        Ok(true)
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get_value(&self, key: &str) -> StoreResult<Option<KvValue>> {
        let inner = self.inner.read().await;
        Ok(inner.entries.get(key).map(|entry| KvValue {
            key: key.to_string(),
            content: entry.content.clone(),
            session: entry.session.clone(),
            lock_index: entry.lock_index,
        }))
    }

    async fn acquire_lock(
        &self,
        key: &str,
        content: &str,
        session: &SessionId,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;

        if !inner.sessions.contains_key(session) {
            return Err(StoreError::InvalidSession(session.to_string()));
        }

        let entry = inner.entries.entry(key.to_string()).or_insert(Entry {
            content: None,
            session: None,
            lock_index: 0,
        });

        match entry.session.clone() {
            Some(holder) if &holder != session => {
                debug!("Key {} already held by session {}", key, holder);
                Ok(false)
            }
            Some(_) => {
                entry.content = Some(content.to_string());
                Ok(true)
            }
            None => {
                entry.content = Some(content.to_string());
                entry.session = Some(session.clone());
                entry.lock_index += 1;
                debug!("Session {} acquired {}", session, key);
                Ok(true)
            }
        }
    }

    async fn release_lock(&self, key: &str, session: &SessionId) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;

        match inner.entries.get_mut(key) {
            Some(entry) if entry.session.as_ref() == Some(session) => {
                entry.session = None;
                debug!("Session {} released {}", session, key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
