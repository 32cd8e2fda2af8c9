//! Configuration for the bootstrap coordinator
//!
//! All inputs are resolved ONCE at process start into an immutable
//! [`BootstrapConfig`] that is threaded through every step: defaults, then
//! an optional TOML file, then `KRAFT_`-prefixed environment variables, then
//! instance metadata attributes (see [`crate::metadata::overlay_config`]).
//! No step re-fetches configuration afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::retry::{BackoffConfig, RetryPolicy};
use crate::common::{Error, Result};

/// Default config file probed when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "/etc/kraft-bootstrap.toml";

/// Kafka versions this coordinator has been run against.
pub const KNOWN_KAFKA_VERSIONS: &[&str] =
    &["3.3.1", "3.4.0", "3.4.1", "3.5.0", "3.5.1", "3.6.0"];

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Declared cluster size. Required (via file, env, or metadata).
    #[serde(default)]
    pub broker_count: u32,

    /// Resource name prefix; instance names are `{prefix}-broker-{ordinal}`.
    /// Required (via file, env, or metadata).
    #[serde(default)]
    pub name_prefix: String,

    /// Pinned Kafka distribution version
    #[serde(default = "default_kafka_version")]
    pub kafka_version: String,

    /// Scala build the tarball was compiled against
    #[serde(default = "default_scala_version")]
    pub scala_version: String,

    /// Topic defaults, passed through to the broker unchanged
    #[serde(default = "default_partitions")]
    pub default_partitions: u32,

    #[serde(default = "default_replication_factor")]
    pub replication_factor: u32,

    #[serde(default = "default_min_insync")]
    pub min_insync_replicas: u32,

    /// Client (data plane) listener port
    #[serde(default = "default_client_port")]
    pub client_port: u16,

    /// Controller (control plane) listener port
    #[serde(default = "default_controller_port")]
    pub controller_port: u16,

    /// DNS suffix appended to broker names when resolving peers
    /// (e.g. ".c.my-project.internal"). Empty means bare names.
    #[serde(default)]
    pub dns_suffix: String,

    /// Distribution mirror base URL
    #[serde(default = "default_mirror")]
    pub mirror: String,

    /// Expected SHA-512 of the distribution tarball (hex). Verified when set.
    #[serde(default)]
    pub distribution_sha512: Option<String>,

    /// Install tree for the unpacked distribution
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,

    /// Broker data directory (`log.dirs`)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Rendered server configuration path
    #[serde(default = "default_server_config_path")]
    pub server_config_path: PathBuf,

    /// Where the step ledger and status report live
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Dedicated service user owning the broker process and data
    #[serde(default = "default_service_user")]
    pub service_user: String,

    /// Retry budget for external calls (peer lookup, downloads)
    #[serde(default)]
    pub retry: RetrySettings,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_kafka_version() -> String {
    "3.6.0".to_string()
}
fn default_scala_version() -> String {
    "2.13".to_string()
}
fn default_partitions() -> u32 {
    6
}
fn default_replication_factor() -> u32 {
    3
}
fn default_min_insync() -> u32 {
    2
}
fn default_client_port() -> u16 {
    9092
}
fn default_controller_port() -> u16 {
    9093
}
fn default_mirror() -> String {
    "https://archive.apache.org/dist/kafka".to_string()
}
fn default_install_dir() -> PathBuf {
    PathBuf::from("/opt/kafka")
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/kafka/data")
}
fn default_server_config_path() -> PathBuf {
    PathBuf::from("/opt/kafka/config/kraft/server.properties")
}
fn default_state_dir() -> PathBuf {
    PathBuf::from("/var/lib/kraft-bootstrap")
}
fn default_service_user() -> String {
    "kafka".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Retry budget for external calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_init_backoff_ms")]
    pub init_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    12
}
fn default_init_backoff_ms() -> u64 {
    500
}
fn default_max_backoff_ms() -> u64 {
    15_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            init_backoff_ms: default_init_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: BackoffConfig {
                init_backoff: Duration::from_millis(self.init_backoff_ms),
                max_backoff: Duration::from_millis(self.max_backoff_ms),
                base: 2.,
            },
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        // Intentionally invalid (broker_count = 0, empty prefix) until the
        // required values are supplied by file, env, or metadata.
        Self {
            broker_count: 0,
            name_prefix: String::new(),
            kafka_version: default_kafka_version(),
            scala_version: default_scala_version(),
            default_partitions: default_partitions(),
            replication_factor: default_replication_factor(),
            min_insync_replicas: default_min_insync(),
            client_port: default_client_port(),
            controller_port: default_controller_port(),
            dns_suffix: String::new(),
            mirror: default_mirror(),
            distribution_sha512: None,
            install_dir: default_install_dir(),
            data_dir: default_data_dir(),
            server_config_path: default_server_config_path(),
            state_dir: default_state_dir(),
            service_user: default_service_user(),
            retry: RetrySettings::default(),
            log_level: default_log_level(),
        }
    }
}

impl BootstrapConfig {
    /// Load configuration: defaults, then the TOML file (the default path is
    /// optional, an explicit `--config` path must exist), then `KRAFT_*`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        builder = match path {
            Some(p) => builder.add_source(config::File::from(p)),
            None => builder.add_source(config::File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false)),
        };

        let settings = builder
            .add_source(
                config::Environment::with_prefix("KRAFT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Validate the cluster invariants. Must pass before any side effect.
    pub fn validate(&self) -> Result<()> {
        if self.broker_count < 1 {
            return Err(Error::InvalidConfig(
                "broker_count must be at least 1".into(),
            ));
        }
        if self.name_prefix.is_empty() {
            return Err(Error::InvalidConfig("name_prefix must not be empty".into()));
        }
        if self.kafka_version.is_empty() {
            return Err(Error::InvalidConfig("kafka_version must not be empty".into()));
        }
        if self.default_partitions < 1 {
            return Err(Error::InvalidConfig(
                "default_partitions must be at least 1".into(),
            ));
        }
        if self.replication_factor < 1 {
            return Err(Error::InvalidConfig(
                "replication_factor must be at least 1".into(),
            ));
        }
        if self.replication_factor > self.broker_count {
            return Err(Error::InvalidConfig(format!(
                "replication_factor {} exceeds broker_count {}",
                self.replication_factor, self.broker_count
            )));
        }
        if self.min_insync_replicas > self.replication_factor {
            return Err(Error::InvalidConfig(format!(
                "min_insync_replicas {} exceeds replication_factor {}",
                self.min_insync_replicas, self.replication_factor
            )));
        }
        if !KNOWN_KAFKA_VERSIONS.contains(&self.kafka_version.as_str()) {
            tracing::warn!(
                "Kafka version {} has not been validated with this coordinator",
                self.kafka_version
            );
        }
        Ok(())
    }

    /// Instance name of the broker with the given ordinal.
    pub fn broker_name(&self, ordinal: u32) -> String {
        format!("{}-broker-{}", self.name_prefix, ordinal)
    }

    /// DNS name used to resolve a broker through the address directory.
    pub fn broker_fqdn(&self, ordinal: u32) -> String {
        format!("{}{}", self.broker_name(ordinal), self.dns_suffix)
    }

    /// Distribution tarball file name, e.g. `kafka_2.13-3.6.0.tgz`.
    pub fn tarball_name(&self) -> String {
        format!("kafka_{}-{}.tgz", self.scala_version, self.kafka_version)
    }

    /// Full download URL for the pinned distribution.
    pub fn download_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.mirror.trim_end_matches('/'),
            self.kafka_version,
            self.tarball_name()
        )
    }

    /// Path of the persisted step ledger.
    pub fn ledger_path(&self) -> PathBuf {
        self.state_dir.join("state.json")
    }

    /// Path of the terminal status report.
    pub fn status_path(&self) -> PathBuf {
        self.state_dir.join("status.json")
    }
}
