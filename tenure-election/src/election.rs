//! Leader election coordinator
//!
//! Each service has one key in the shared store. A node becomes leader by
//! creating a session and binding the key to it with the store's atomic
//! conditional acquire; the key's content is the leader's info string.
//! The coordinator keeps no state of its own, so one instance can be shared
//! freely across tasks.

use crate::config::{ElectionConfig, ReleasePolicy};
use crate::error::{ElectionError, ElectionResult};
use std::sync::Arc;
use tenure_store::{KeyValueStore, KvValue, SessionId, SessionProvider};
use tracing::{debug, info, warn};

/// Result of a single election attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElectionOutcome {
    /// This caller now holds the key.
    Elected {
        /// Session bound to the key
        session: SessionId,
        /// Info published as leader
        info: String,
    },
    /// Another session holds the key.
    Lost {
        /// Current leader's info, if the key is still held when re-read
        leader: Option<String>,
    },
}

impl ElectionOutcome {
    /// Whether this attempt won.
    pub fn is_elected(&self) -> bool {
        matches!(self, ElectionOutcome::Elected { .. })
    }

    /// Session won by this attempt.
    pub fn session(&self) -> Option<&SessionId> {
        match self {
            ElectionOutcome::Elected { session, .. } => Some(session),
            ElectionOutcome::Lost { .. } => None,
        }
    }

    /// Info of whoever leads after this attempt.
    pub fn leader_info(self) -> Option<String> {
        match self {
            ElectionOutcome::Elected { info, .. } => Some(info),
            ElectionOutcome::Lost { leader } => leader,
        }
    }
}

/// A held leadership key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadershipRecord {
    /// Leader info
    pub content: Option<String>,
    /// Session holding the key
    pub session: SessionId,
    /// Number of acquisitions of the key so far
    pub lock_index: u64,
}

impl LeadershipRecord {
    fn from_value(value: KvValue) -> Option<Self> {
        let session = value.session?;
        Some(Self {
            content: value.content,
            session,
            lock_index: value.lock_index,
        })
    }
}

/// Leader election coordinator
pub struct LeaderElection {
    kv: Arc<dyn KeyValueStore>,
    sessions: Arc<dyn SessionProvider>,
    config: ElectionConfig,
}

impl LeaderElection {
    /// Create a coordinator over a backend that provides both sessions and KV
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use std::sync::Arc;
    /// use tenure_election::LeaderElection;
    /// use tenure_store::InMemoryStore;
    ///
    /// let election = LeaderElection::new(Arc::new(InMemoryStore::new()));
    /// let leader = election.elect_new_leader("api", "node1:8080").await?;
    /// ```
    pub fn new<B>(backend: Arc<B>) -> Self
    where
        B: KeyValueStore + SessionProvider + 'static,
    {
        Self::with_collaborators(backend.clone(), backend)
    }

    /// Create a coordinator over separate collaborators.
    pub fn with_collaborators(
        kv: Arc<dyn KeyValueStore>,
        sessions: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            kv,
            sessions,
            config: ElectionConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: ElectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    /// Key holding the leadership record for `service`.
    ///
    /// The name must be a single non-empty path segment other than `.` or
    /// `..`, so that distinct names always map to distinct keys.
    pub fn service_key(&self, service: &str) -> ElectionResult<String> {
        if matches!(service, "" | "." | "..") || service.contains('/') {
            return Err(ElectionError::InvalidServiceName(service.to_string()));
        }
        Ok(self.config.key_for(service))
    }

    /// Read the record for `service` if some session holds it.
    pub async fn leader_record(&self, service: &str) -> ElectionResult<Option<LeadershipRecord>> {
        let key = self.service_key(service)?;
        let value = self.kv.get_value(&key).await?;
        Ok(value.and_then(LeadershipRecord::from_value))
    }

    /// Current leader's info.
    ///
    /// A key that exists but is not bound to a session has no leader, even
    /// though it still carries the previous leader's info.
    pub async fn get_leader_info(&self, service: &str) -> ElectionResult<Option<String>> {
        Ok(self
            .leader_record(service)
            .await?
            .and_then(|record| record.content))
    }

    /// Whether `session` currently holds leadership of `service`.
    pub async fn is_leader(&self, service: &str, session: &SessionId) -> ElectionResult<bool> {
        Ok(self
            .leader_record(service)
            .await?
            .is_some_and(|record| &record.session == session))
    }

    /// Make one attempt to become leader of `service`, publishing `info`.
    ///
    /// Never retries. A fresh session named after the service is created for
    /// the attempt.
    pub async fn campaign(&self, service: &str, info: &str) -> ElectionResult<ElectionOutcome> {
        let key = self.service_key(service)?;
        let session = self.sessions.create_session(service).await?;

        let acquired = match self.kv.acquire_lock(&key, info, &session).await {
            Ok(acquired) => acquired,
            Err(e) => {
                self.end_session(&session).await;
                return Err(e.into());
            }
        };

        if acquired {
            info!("Session {} became leader for {}", session, service);
            return Ok(ElectionOutcome::Elected {
                session,
                info: info.to_string(),
            });
        }

        debug!("Session {} lost election for {}", session, service);
        if self.config.destroy_losing_sessions {
            self.end_session(&session).await;
        }

        let leader = self.get_leader_info(service).await?;
        Ok(ElectionOutcome::Lost { leader })
    }

    /// Try to become leader of `service`.
    ///
    /// Returns `Some(info)` on success, otherwise the current leader's info
    /// (absent if the key was vacated in the meantime).
    pub async fn elect_new_leader(
        &self,
        service: &str,
        info: &str,
    ) -> ElectionResult<Option<String>> {
        Ok(self.campaign(service, info).await?.leader_info())
    }

    /// Vacate leadership of `service`, whoever holds it.
    ///
    /// A vacant key reports `true`. Under [`ReleasePolicy::Strict`] a held key
    /// fails with [`ElectionError::OwnershipRequired`]; use
    /// [`release_leadership_as`](Self::release_leadership_as) instead.
    pub async fn release_leadership(&self, service: &str) -> ElectionResult<bool> {
        let key = self.service_key(service)?;

        let holder = match self.kv.get_value(&key).await? {
            Some(KvValue {
                session: Some(holder),
                ..
            }) => holder,
            _ => {
                debug!("Leadership for {} already vacant", service);
                return Ok(true);
            }
        };

        if self.config.release_policy == ReleasePolicy::Strict {
            return Err(ElectionError::OwnershipRequired(service.to_string()));
        }

        self.release_key(service, &key, &holder).await
    }

    /// Vacate leadership of `service` held by `session`.
    ///
    /// A vacant key reports `true`; a key held by another session fails with
    /// [`ElectionError::NotLeader`].
    pub async fn release_leadership_as(
        &self,
        service: &str,
        session: &SessionId,
    ) -> ElectionResult<bool> {
        let key = self.service_key(service)?;

        match self.kv.get_value(&key).await? {
            Some(value) if value.is_held_by(session) => {
                self.release_key(service, &key, session).await
            }
            Some(KvValue {
                session: Some(_), ..
            }) => Err(ElectionError::NotLeader {
                service: service.to_string(),
                session: session.clone(),
            }),
            _ => Ok(true),
        }
    }

    /// Destroy a session, logging instead of failing.
    pub async fn end_session(&self, session: &SessionId) -> bool {
        match self.sessions.destroy_session(session).await {
            Ok(destroyed) => destroyed,
            Err(e) => {
                warn!("Failed to destroy session {}: {}", session, e);
                false
            }
        }
    }

    async fn release_key(
        &self,
        service: &str,
        key: &str,
        session: &SessionId,
    ) -> ElectionResult<bool> {
        let released = self.kv.release_lock(key, session).await?;
        if released {
            info!("Released leadership for {} (session {})", service, session);
        } else {
            warn!("Release of {} by session {} was refused", service, session);
        }
        Ok(released)
    }
}
