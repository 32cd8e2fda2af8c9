//! # kraft-bootstrap
//!
//! Boot-time cluster bootstrap coordinator for KRaft-mode Kafka broker VMs:
//! - derives this broker's node identity from its instance name
//! - resolves every peer's reserved address with bounded, jittered retries
//! - renders the broker configuration with the shared quorum voter set
//! - installs a systemd unit and, on the first node only, formats storage
//! - records each completed step in a local ledger for resumable re-runs
//! - writes a classified terminal status report for external health checks
//!
//! ## Execution model
//!
//! ```text
//!  metadata ──► identity ──► host prep ──► distribution
//!                                              │
//!  directory ──► peer rendezvous ──► voter set │
//!                        │                     │
//!                        └──► server.properties┘──► systemd unit
//!                                                       │
//!                              node 0 only: storage format
//!                                                       │
//!                                                    start
//! ```
//!
//! Each broker runs this once, independently and concurrently with its
//! peers. There is no leader election and no message passing during
//! bootstrap; correctness rests on every broker deriving the same voter set
//! from the same static ordinal → address mapping, which the coordinator
//! confirms before proceeding.
//!
//! ## Usage
//!
//! ```bash
//! # full bootstrap (run from the instance's startup hook)
//! kraft-bootstrap run
//!
//! # validate configuration without side effects
//! kraft-bootstrap validate --config ./bootstrap.toml
//!
//! # inspect the persisted terminal status
//! kraft-bootstrap status
//!
//! # probe every broker's client and controller ports
//! kraft-bootstrap check
//! ```

pub mod bootstrap;
pub mod common;
pub mod directory;
pub mod metadata;
pub mod ops;
pub mod system;

// Re-export commonly used types
pub use bootstrap::{Coordinator, Phase, StatusReport};
pub use common::{BootstrapConfig, Error, Outcome, Result};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build info
pub const BUILD_INFO: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CARGO_PKG_NAME"), ")");
