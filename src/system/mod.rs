//! Host-side effects
//!
//! Everything that mutates the VM (packages, users, directories, the
//! unpacked distribution, systemd units, storage formatting) goes through
//! the [`Host`] trait. [`SystemHost`] is the real implementation; tests
//! substitute a recording mock so an N-broker bootstrap can be simulated in
//! a process.

mod linux;

pub use linux::SystemHost;

use std::path::Path;

use crate::common::{BootstrapConfig, Result};

#[allow(async_fn_in_trait)]
pub trait Host {
    /// Install the broker's runtime dependencies. Idempotent.
    async fn ensure_packages(&self) -> Result<()>;

    /// Create the dedicated service user if it does not exist. Idempotent.
    async fn ensure_user(&self, user: &str) -> Result<()>;

    /// Create the install/data/state directory tree with correct ownership.
    /// Idempotent.
    async fn ensure_dirs(&self, config: &BootstrapConfig) -> Result<()>;

    /// Download, verify, and unpack the pinned distribution. Skips work when
    /// the installed version already matches.
    async fn fetch_distribution(&self, config: &BootstrapConfig) -> Result<()>;

    /// Atomically write a file and hand ownership to the service user.
    async fn write_owned_file(&self, path: &Path, contents: &str, user: &str) -> Result<()>;

    /// Install and enable a service supervisor unit.
    async fn install_unit(&self, name: &str, contents: &str) -> Result<()>;

    /// Start (or restart after failure) a previously installed unit.
    async fn start_service(&self, name: &str) -> Result<()>;

    /// One-time on-disk storage formatting with the given cluster ID.
    async fn format_storage(&self, config: &BootstrapConfig, cluster_id: &str) -> Result<()>;
}
