//! Leader election for Tenure
//!
//! Session-bound mutual exclusion over a shared key-value store.
//!
//! ## Features
//!
//! - **Single-shot elections** - One atomic acquire per attempt, no hidden retries
//! - **Stale-safe reads** - A vacated key never reports a leader
//! - **Release policies** - Permissive (anyone may vacate) or strict
//! - **Campaigns** - Optional polling loop with elected/revoked callbacks
//!
//! ## Quick Start
//!
//! ### One-off election
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tenure_election::LeaderElection;
//! use tenure_store::InMemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let election = LeaderElection::new(Arc::new(InMemoryStore::new()));
//!
//!     match election.elect_new_leader("scheduler", "node-1:9000").await? {
//!         Some(leader) => println!("Leader: {}", leader),
//!         None => println!("No leader right now"),
//!     }
//!
//!     election.release_leadership("scheduler").await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Campaign
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tenure_election::*;
//!
//! let election = Arc::new(LeaderElection::new(store));
//! let campaign = Arc::new(
//!     Campaign::new(election, "scheduler", "node-1:9000")
//!         .with_interval(Duration::from_secs(10))
//!         .on_elected(|| async { println!("I am the leader!") }),
//! );
//!
//! tokio::spawn(campaign.clone().run());
//! ```

pub mod campaign;
pub mod config;
pub mod election;
pub mod error;

pub use campaign::{Campaign, DEFAULT_POLL_INTERVAL, LeaderCallback};
pub use config::{ElectionConfig, ElectionConfigBuilder, ReleasePolicy};
pub use election::{ElectionOutcome, LeaderElection, LeadershipRecord};
pub use error::{ElectionError, ElectionResult};
