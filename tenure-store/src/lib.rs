//! Collaborators for Tenure leader election
//!
//! This crate defines the narrow interface the election coordinator needs
//! from its environment.
//!
//! ## Features
//!
//! - **Session Provider** - Issue liveness-bound session tokens
//! - **Key-Value Store** - Per-key reads plus session-bound conditional writes
//! - **In-Memory Backend** - Single-process implementation of both
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tenure_store::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryStore::new();
//!
//!     let session = store.create_session("api").await?;
//!     if store.acquire_lock("service/api/leader", "node1", &session).await? {
//!         println!("Holding the lock");
//!     }
//!
//!     store.release_lock("service/api/leader", &session).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use traits::{KeyValueStore, KvValue, SessionId, SessionProvider};
