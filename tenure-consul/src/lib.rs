//! Consul backend for Tenure
//!
//! Implements the session and key-value collaborator traits over the Consul
//! v1 HTTP API, so the election coordinator can run against a Consul agent.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tenure_consul::{ConsulClient, ConsulConfig};
//! use tenure_store::{KeyValueStore, SessionProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let consul = ConsulClient::new(ConsulConfig::new("http://localhost:8500"))?;
//!
//!     let session = consul.create_session("api").await?;
//!     let acquired = consul
//!         .acquire_lock("service/api/leader", "node1", &session)
//!         .await?;
//!
//!     println!("acquired: {}", acquired);
//!     Ok(())
//! }
//! ```
//!
//! Configuration can also come from the environment (`CONSUL_HTTP_ADDR`,
//! `CONSUL_HTTP_TOKEN`, `CONSUL_DATACENTER`):
//!
//! ```rust,ignore
//! let consul = tenure_consul::ConsulClient::from_env()?;
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::ConsulClient;
pub use config::{ConsulConfig, ConsulConfigBuilder, DEFAULT_ADDRESS};
pub use error::{ConsulError, Result};
