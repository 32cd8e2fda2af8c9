//! Shared fixtures for integration tests: a recording mock host and
//! per-broker config/metadata builders.

// not every test binary uses every helper
#![allow(dead_code)]

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use kraft_bootstrap::common::BootstrapConfig;
use kraft_bootstrap::directory::StaticDirectory;
use kraft_bootstrap::metadata::StaticMetadata;
use kraft_bootstrap::system::Host;
use kraft_bootstrap::Result;

/// One recorded host side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Packages,
    User(String),
    Dirs,
    Distribution,
    WriteFile { path: PathBuf, contents: String },
    InstallUnit(String),
    Start(String),
    Format { cluster_id: String },
}

/// Host double that records every invocation instead of touching the VM.
/// Cloning shares the recorder, so N simulated brokers can write into one
/// action log.
#[derive(Debug, Clone, Default)]
pub struct MockHost {
    actions: Arc<Mutex<Vec<Action>>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, action: Action) {
        self.actions.lock().unwrap().push(action);
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    pub fn format_invocations(&self) -> usize {
        self.actions()
            .iter()
            .filter(|a| matches!(a, Action::Format { .. }))
            .count()
    }

    pub fn written_file(&self, path: &Path) -> Option<String> {
        self.actions().into_iter().find_map(|a| match a {
            Action::WriteFile {
                path: p, contents, ..
            } if p == path => Some(contents),
            _ => None,
        })
    }
}

impl Host for MockHost {
    async fn ensure_packages(&self) -> Result<()> {
        self.push(Action::Packages);
        Ok(())
    }

    async fn ensure_user(&self, user: &str) -> Result<()> {
        self.push(Action::User(user.to_string()));
        Ok(())
    }

    async fn ensure_dirs(&self, _config: &BootstrapConfig) -> Result<()> {
        self.push(Action::Dirs);
        Ok(())
    }

    async fn fetch_distribution(&self, _config: &BootstrapConfig) -> Result<()> {
        self.push(Action::Distribution);
        Ok(())
    }

    async fn write_owned_file(&self, path: &Path, contents: &str, _user: &str) -> Result<()> {
        self.push(Action::WriteFile {
            path: path.to_path_buf(),
            contents: contents.to_string(),
        });
        Ok(())
    }

    async fn install_unit(&self, name: &str, _contents: &str) -> Result<()> {
        self.push(Action::InstallUnit(name.to_string()));
        Ok(())
    }

    async fn start_service(&self, name: &str) -> Result<()> {
        self.push(Action::Start(name.to_string()));
        Ok(())
    }

    async fn format_storage(&self, _config: &BootstrapConfig, cluster_id: &str) -> Result<()> {
        self.push(Action::Format {
            cluster_id: cluster_id.to_string(),
        });
        Ok(())
    }
}

/// Cluster config for broker `ordinal`, with all paths under `root` so
/// ledger and status report land in the test's tempdir.
pub fn broker_config(root: &Path, broker_count: u32, ordinal: u32) -> BootstrapConfig {
    let mut config = BootstrapConfig {
        broker_count,
        name_prefix: "acme".into(),
        install_dir: root.join(format!("install-{}", ordinal)),
        data_dir: root.join(format!("data-{}", ordinal)),
        server_config_path: root.join(format!("server-{}.properties", ordinal)),
        state_dir: root.join(format!("state-{}", ordinal)),
        ..Default::default()
    };
    config.retry.max_attempts = 3;
    config.retry.init_backoff_ms = 1;
    config.retry.max_backoff_ms = 5;
    // Keep the replication invariants (rf ≤ broker_count, min-insync ≤ rf)
    // satisfiable for whatever cluster size this fixture is built for, so
    // single-broker clusters produce a valid config. Tests that want an
    // invalid config override these explicitly after calling this builder.
    config.replication_factor = config.replication_factor.min(broker_count.max(1));
    config.min_insync_replicas = config.min_insync_replicas.min(config.replication_factor);
    config
}

/// Address assigned to broker `ordinal` in the simulated VPC.
pub fn broker_address(ordinal: u32) -> IpAddr {
    format!("10.0.0.{}", ordinal + 2).parse().unwrap()
}

/// Metadata source describing broker `ordinal`.
pub fn broker_metadata(ordinal: u32) -> StaticMetadata {
    StaticMetadata::new(format!("acme-broker-{}", ordinal), broker_address(ordinal))
}

/// Directory with the first `registered` brokers' addresses present.
pub fn directory_with(registered: u32) -> StaticDirectory {
    let dir = StaticDirectory::new();
    for ordinal in 0..registered {
        dir.insert(format!("acme-broker-{}", ordinal), broker_address(ordinal));
    }
    dir
}
