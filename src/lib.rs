// Tenure - session-bound leader election over a shared key-value store
//
// This crate re-exports the workspace members: the collaborator traits and
// in-memory backend, the election coordinator, and (by default) the Consul
// backend.

// Re-export the election coordinator
pub use tenure_election::*;

// Re-export collaborator traits and the in-memory backend
pub use tenure_store::{
    InMemoryStore, KeyValueStore, KvValue, SessionId, SessionProvider, StoreError, StoreResult,
};

// Re-export member crates
pub use tenure_election;
pub use tenure_store;

#[cfg(feature = "consul")]
pub use tenure_consul;

#[cfg(feature = "consul")]
pub use tenure_consul::{ConsulClient, ConsulConfig, ConsulError};

/// Prelude for common imports.
///
/// ```
/// use tenure::prelude::*;
/// ```
pub mod prelude {
    pub use tenure_election::{
        Campaign, ElectionConfig, ElectionError, ElectionOutcome,
        ElectionResult, LeaderElection, ReleasePolicy,
    };
    pub use tenure_store::{InMemoryStore, KeyValueStore, SessionId, SessionProvider};

    #[cfg(feature = "consul")]
    pub use tenure_consul::{ConsulClient, ConsulConfig};
}
