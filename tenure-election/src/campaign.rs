//! Continuous candidacy on top of single-shot elections

use crate::election::{ElectionOutcome, LeaderElection};
use crate::error::{ElectionError, ElectionResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tenure_store::SessionId;
use tokio::sync::{Notify, RwLock};
use tracing::{debug, error, info, warn};

/// Leadership change callback
pub type LeaderCallback =
    Arc<dyn Fn() -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> + Send + Sync>;

/// Default interval between election attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Keeps a node in the running for leadership of one service.
///
/// Every poll either confirms the node's session still holds the key, or
/// makes a fresh single-shot attempt. Losing the key (released by someone
/// else, or the session expiring) is only noticed on the next poll.
pub struct Campaign {
    election: Arc<LeaderElection>,

    /// Service being campaigned for
    service: String,

    /// Info published while leader
    info: String,

    /// Delay between polls
    interval: Duration,

    /// Session holding the key while leader
    session: RwLock<Option<SessionId>>,

    /// Is this node the leader?
    is_leader: AtomicBool,

    /// Callback when becoming leader
    on_elected: Option<LeaderCallback>,

    /// Callback when losing leadership
    on_revoked: Option<LeaderCallback>,

    /// Running flag
    running: AtomicBool,

    /// Set once by `stop`; never cleared
    stopped: AtomicBool,

    shutdown: Notify,
}

impl Campaign {
    /// Create a campaign
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use std::sync::Arc;
    /// use tenure_election::{Campaign, LeaderElection};
    ///
    /// let election = Arc::new(LeaderElection::new(store));
    /// let campaign = Arc::new(
    ///     Campaign::new(election, "scheduler", "node-1:9000")
    ///         .on_elected(|| async { println!("I am the leader!") })
    ///         .on_revoked(|| async { println!("I lost leadership") }),
    /// );
    ///
    /// tokio::spawn(campaign.clone().run());
    /// ```
    pub fn new(
        election: Arc<LeaderElection>,
        service: impl Into<String>,
        info: impl Into<String>,
    ) -> Self {
        Self {
            election,
            service: service.into(),
            info: info.into(),
            interval: DEFAULT_POLL_INTERVAL,
            session: RwLock::new(None),
            is_leader: AtomicBool::new(false),
            on_elected: None,
            on_revoked: None,
            running: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    /// Set the poll interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set callback for when this node becomes leader
    pub fn on_elected<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.on_elected = Some(Arc::new(move || Box::pin(callback())));
        self
    }

    /// Set callback for when this node loses leadership
    pub fn on_revoked<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.on_revoked = Some(Arc::new(move || Box::pin(callback())));
        self
    }

    /// Check if this node is the leader
    pub fn is_leader(&self) -> bool {
        self.is_leader.load(Ordering::Acquire)
    }

    /// Check if the campaign loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Session held while leader
    pub async fn session(&self) -> Option<SessionId> {
        self.session.read().await.clone()
    }

    /// Service name
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Published info
    pub fn info(&self) -> &str {
        &self.info
    }

    /// Run one round: confirm leadership or try to take it.
    ///
    /// Returns whether this node is leader afterwards.
    pub async fn poll_once(&self) -> ElectionResult<bool> {
        let held = self.session.read().await.clone();

        if let Some(session) = held {
            if self.election.is_leader(&self.service, &session).await? {
                debug!("Still leader for {} (session {})", self.service, session);
                return Ok(true);
            }

            warn!("Lost leadership for {} (session {})", self.service, session);
            *self.session.write().await = None;
            self.election.end_session(&session).await;
            self.revoke().await;
        }

        match self.election.campaign(&self.service, &self.info).await? {
            ElectionOutcome::Elected { session, .. } => {
                *self.session.write().await = Some(session);
                self.is_leader.store(true, Ordering::Release);
                info!("Elected leader for {}", self.service);

                if let Some(callback) = &self.on_elected {
                    callback().await;
                }
                Ok(true)
            }
            ElectionOutcome::Lost { leader } => {
                debug!("Not leader for {}; current leader: {:?}", self.service, leader);
                Ok(false)
            }
        }
    }

    /// Start campaigning until [`stop`](Self::stop) is called.
    ///
    /// On exit, leadership held by this node is released. A stopped campaign
    /// cannot be restarted; `run` returns immediately.
    pub async fn run(self: Arc<Self>) -> ElectionResult<()> {
        if self.stopped.load(Ordering::Acquire) {
            debug!("Campaign for {} already stopped", self.service);
            return Ok(());
        }
        self.running.store(true, Ordering::Release);

        info!(
            "Starting campaign for {} (info: {})",
            self.service, self.info
        );

        while !self.stopped.load(Ordering::Acquire) {
            if let Err(e) = self.poll_once().await {
                error!("Leader election error for {}: {}", self.service, e);

                // An unverifiable leadership is treated as lost
                let lost = self.session.write().await.take();
                if let Some(session) = lost {
                    self.election.end_session(&session).await;
                    self.revoke().await;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.notified() => {}
            }
        }

        self.running.store(false, Ordering::Release);

        if self.is_leader() {
            self.resign().await?;
        }

        info!("Campaign for {} stopped", self.service);
        Ok(())
    }

    /// Stop campaigning
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.shutdown.notify_one();
    }

    /// Give up leadership now.
    ///
    /// Returns `false` if this node was not leader. The session is destroyed
    /// either way; the `on_revoked` callback is not fired.
    pub async fn resign(&self) -> ElectionResult<bool> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(false);
        };
        self.is_leader.store(false, Ordering::Release);

        let released = match self
            .election
            .release_leadership_as(&self.service, &session)
            .await
        {
            Ok(released) => released,
            Err(ElectionError::NotLeader { .. }) => false,
            Err(e) => {
                self.election.end_session(&session).await;
                return Err(e);
            }
        };

        self.election.end_session(&session).await;
        info!("Resigned leadership for {}", self.service);
        Ok(released)
    }

    async fn revoke(&self) {
        if self.is_leader.swap(false, Ordering::AcqRel)
            && let Some(callback) = &self.on_revoked
        {
            callback().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tenure_store::{InMemoryStore, KeyValueStore, KvValue, StoreError, StoreResult};

    struct Counters {
        elected: Arc<AtomicUsize>,
        revoked: Arc<AtomicUsize>,
    }

    fn counted(campaign: Campaign) -> (Campaign, Counters) {
        let elected = Arc::new(AtomicUsize::new(0));
        let revoked = Arc::new(AtomicUsize::new(0));

        let e = elected.clone();
        let r = revoked.clone();
        let campaign = campaign
            .on_elected(move || {
                let e = e.clone();
                async move {
                    e.fetch_add(1, Ordering::SeqCst);
                }
            })
            .on_revoked(move || {
                let r = r.clone();
                async move {
                    r.fetch_add(1, Ordering::SeqCst);
                }
            });

        (campaign, Counters { elected, revoked })
    }

    fn setup() -> (Arc<InMemoryStore>, Arc<LeaderElection>) {
        let store = Arc::new(InMemoryStore::new());
        let election = Arc::new(LeaderElection::new(store.clone()));
        (store, election)
    }

    /// KV store whose operations fail while `failing` is set.
    struct FlakyStore {
        inner: Arc<InMemoryStore>,
        failing: AtomicBool,
    }

    impl FlakyStore {
        fn check(&self) -> StoreResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("connection reset".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get_value(&self, key: &str) -> StoreResult<Option<KvValue>> {
            self.check()?;
            self.inner.get_value(key).await
        }

        async fn acquire_lock(
            &self,
            key: &str,
            content: &str,
            session: &SessionId,
        ) -> StoreResult<bool> {
            self.check()?;
            self.inner.acquire_lock(key, content, session).await
        }

        async fn release_lock(&self, key: &str, session: &SessionId) -> StoreResult<bool> {
            self.check()?;
            self.inner.release_lock(key, session).await
        }
    }

    async fn wait_for(condition: impl Fn() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[test]
    fn test_campaign_settings() {
        let (_, election) = setup();
        let campaign = Campaign::new(election, "scheduler", "node-1")
            .with_interval(Duration::from_secs(60));

        assert_eq!(campaign.service(), "scheduler");
        assert_eq!(campaign.info(), "node-1");
        assert_eq!(campaign.interval, Duration::from_secs(60));
        assert!(!campaign.is_leader());
        assert!(!campaign.is_running());
    }

    #[tokio::test]
    async fn test_poll_elects_once() {
        let (_, election) = setup();
        let (campaign, counters) = counted(Campaign::new(election.clone(), "scheduler", "node-1"));

        assert!(campaign.poll_once().await.unwrap());
        assert!(campaign.poll_once().await.unwrap());

        assert!(campaign.is_leader());
        assert!(campaign.session().await.is_some());
        assert_eq!(counters.elected.load(Ordering::SeqCst), 1);
        assert_eq!(
            election.get_leader_info("scheduler").await.unwrap(),
            Some("node-1".to_string())
        );
    }

    #[tokio::test]
    async fn test_second_candidate_waits() {
        let (_, election) = setup();
        let first = Campaign::new(election.clone(), "scheduler", "node-1");
        let second = Campaign::new(election.clone(), "scheduler", "node-2");

        assert!(first.poll_once().await.unwrap());
        assert!(!second.poll_once().await.unwrap());
        assert!(!second.is_leader());

        assert!(first.resign().await.unwrap());
        assert!(!first.is_leader());
        assert!(second.poll_once().await.unwrap());
        assert_eq!(
            election.get_leader_info("scheduler").await.unwrap(),
            Some("node-2".to_string())
        );
    }

    #[tokio::test]
    async fn test_forced_release_is_noticed() {
        let (_, election) = setup();
        let (campaign, counters) = counted(Campaign::new(election.clone(), "scheduler", "node-1"));
        let rival = Campaign::new(election.clone(), "scheduler", "node-2");

        campaign.poll_once().await.unwrap();
        assert!(election.release_leadership("scheduler").await.unwrap());
        assert!(rival.poll_once().await.unwrap());

        assert!(!campaign.poll_once().await.unwrap());
        assert!(!campaign.is_leader());
        assert!(campaign.session().await.is_none());
        assert_eq!(counters.revoked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_session_is_replaced() {
        let (store, election) = setup();
        let (campaign, counters) = counted(Campaign::new(election.clone(), "scheduler", "node-1"));

        campaign.poll_once().await.unwrap();
        let first = campaign.session().await.unwrap();
        store.invalidate_session(&first).await;

        // Revoked, then immediately re-elected with a new session
        assert!(campaign.poll_once().await.unwrap());
        let second = campaign.session().await.unwrap();
        assert_ne!(first, second);
        assert_eq!(counters.revoked.load(Ordering::SeqCst), 1);
        assert_eq!(counters.elected.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resign_without_leadership() {
        let (_, election) = setup();
        let campaign = Campaign::new(election, "scheduler", "node-1");
        assert!(!campaign.resign().await.unwrap());
    }

    #[tokio::test]
    async fn test_run_and_stop_releases() {
        let (store, election) = setup();
        let campaign = Arc::new(
            Campaign::new(election.clone(), "scheduler", "node-1")
                .with_interval(Duration::from_millis(10)),
        );

        let handle = tokio::spawn(campaign.clone().run());

        for _ in 0..100 {
            if campaign.is_leader() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(campaign.is_leader());

        campaign.stop();
        handle.await.unwrap().unwrap();

        assert!(!campaign.is_leader());
        assert!(!campaign.is_running());
        assert_eq!(election.get_leader_info("scheduler").await.unwrap(), None);
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_stop_before_run_exits() {
        let (store, election) = setup();
        let campaign = Arc::new(
            Campaign::new(election.clone(), "scheduler", "node-1")
                .with_interval(Duration::from_millis(10)),
        );

        campaign.stop();
        let handle = tokio::spawn(campaign.clone().run());

        let joined = tokio::time::timeout(Duration::from_millis(500), handle).await;
        assert!(joined.is_ok());
        joined.unwrap().unwrap().unwrap();

        assert!(!campaign.is_leader());
        assert!(!campaign.is_running());
        assert_eq!(election.get_leader_info("scheduler").await.unwrap(), None);
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_store_failure_while_leader_revokes() {
        let store = Arc::new(InMemoryStore::new());
        let flaky = Arc::new(FlakyStore {
            inner: store.clone(),
            failing: AtomicBool::new(false),
        });
        let election = Arc::new(LeaderElection::with_collaborators(
            flaky.clone(),
            store.clone(),
        ));
        let (campaign, counters) = counted(
            Campaign::new(election, "scheduler", "node-1")
                .with_interval(Duration::from_millis(10)),
        );
        let campaign = Arc::new(campaign);

        let handle = tokio::spawn(campaign.clone().run());
        wait_for(|| campaign.is_leader()).await;
        assert!(campaign.is_leader());
        let held = campaign.session().await.unwrap();

        flaky.failing.store(true, Ordering::SeqCst);
        wait_for(|| counters.revoked.load(Ordering::SeqCst) > 0).await;

        campaign.stop();
        handle.await.unwrap().unwrap();

        assert_eq!(counters.elected.load(Ordering::SeqCst), 1);
        assert_eq!(counters.revoked.load(Ordering::SeqCst), 1);
        assert!(!campaign.is_leader());
        assert!(campaign.session().await.is_none());
        assert!(!store.session_exists(&held).await);
        assert_eq!(store.session_count().await, 0);
    }
}
