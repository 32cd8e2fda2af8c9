//! Instance metadata access
//!
//! The provisioner injects the cluster configuration as per-instance
//! metadata attributes before boot. [`MetadataSource`] abstracts that
//! key/value service: [`GceMetadata`] talks to the real GCE metadata server,
//! [`StaticMetadata`] backs tests and dry runs. All attributes are read once
//! at startup via [`overlay_config`] and never re-fetched.

mod gce;

pub use gce::GceMetadata;

use std::collections::HashMap;
use std::net::IpAddr;

use crate::common::{BootstrapConfig, Error, Result};

/// Synchronous key/value fetch scoped to the running instance.
#[allow(async_fn_in_trait)]
pub trait MetadataSource {
    /// Fetch a custom attribute by key. `Ok(None)` means the attribute was
    /// not set by the provisioner, which is not an error by itself.
    async fn attribute(&self, key: &str) -> Result<Option<String>>;

    /// This instance's name as assigned at creation time.
    async fn instance_name(&self) -> Result<String>;

    /// This instance's reserved internal address.
    async fn internal_address(&self) -> Result<IpAddr>;
}

/// Attribute keys recognized by the coordinator, in the form the
/// provisioner writes them.
const ATTR_BROKER_COUNT: &str = "broker-count";
const ATTR_NAME_PREFIX: &str = "name-prefix";
const ATTR_KAFKA_VERSION: &str = "kafka-version";
const ATTR_DEFAULT_PARTITIONS: &str = "default-partitions";
const ATTR_REPLICATION_FACTOR: &str = "replication-factor";
const ATTR_MIN_INSYNC_REPLICAS: &str = "min-insync-replicas";
const ATTR_DNS_SUFFIX: &str = "dns-suffix";
const ATTR_MIRROR_URL: &str = "mirror-url";
const ATTR_DISTRIBUTION_SHA512: &str = "distribution-sha512";

/// Overlay instance metadata attributes onto an already-loaded config.
/// Present attributes win over file/env values; absent ones are left alone.
pub async fn overlay_config<M: MetadataSource>(
    config: &mut BootstrapConfig,
    source: &M,
) -> Result<()> {
    if let Some(v) = source.attribute(ATTR_BROKER_COUNT).await? {
        config.broker_count = parse_attr(ATTR_BROKER_COUNT, &v)?;
    }
    if let Some(v) = source.attribute(ATTR_NAME_PREFIX).await? {
        config.name_prefix = v;
    }
    if let Some(v) = source.attribute(ATTR_KAFKA_VERSION).await? {
        config.kafka_version = v;
    }
    if let Some(v) = source.attribute(ATTR_DEFAULT_PARTITIONS).await? {
        config.default_partitions = parse_attr(ATTR_DEFAULT_PARTITIONS, &v)?;
    }
    if let Some(v) = source.attribute(ATTR_REPLICATION_FACTOR).await? {
        config.replication_factor = parse_attr(ATTR_REPLICATION_FACTOR, &v)?;
    }
    if let Some(v) = source.attribute(ATTR_MIN_INSYNC_REPLICAS).await? {
        config.min_insync_replicas = parse_attr(ATTR_MIN_INSYNC_REPLICAS, &v)?;
    }
    if let Some(v) = source.attribute(ATTR_DNS_SUFFIX).await? {
        config.dns_suffix = v;
    }
    if let Some(v) = source.attribute(ATTR_MIRROR_URL).await? {
        config.mirror = v;
    }
    if let Some(v) = source.attribute(ATTR_DISTRIBUTION_SHA512).await? {
        config.distribution_sha512 = Some(v);
    }
    Ok(())
}

fn parse_attr(key: &str, value: &str) -> Result<u32> {
    value.trim().parse().map_err(|_| {
        Error::InvalidConfig(format!("attribute {} is not a number: {:?}", key, value))
    })
}

/// In-memory metadata source for tests and local dry runs.
#[derive(Debug, Clone)]
pub struct StaticMetadata {
    name: String,
    address: IpAddr,
    attributes: HashMap<String, String>,
}

impl StaticMetadata {
    pub fn new(name: impl Into<String>, address: IpAddr) -> Self {
        Self {
            name: name.into(),
            address,
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

impl MetadataSource for StaticMetadata {
    async fn attribute(&self, key: &str) -> Result<Option<String>> {
        Ok(self.attributes.get(key).cloned())
    }

    async fn instance_name(&self) -> Result<String> {
        Ok(self.name.clone())
    }

    async fn internal_address(&self) -> Result<IpAddr> {
        Ok(self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> StaticMetadata {
        StaticMetadata::new("acme-broker-1", "10.0.0.3".parse().unwrap())
            .with_attribute("broker-count", "5")
            .with_attribute("name-prefix", "acme")
            .with_attribute("kafka-version", "3.5.1")
            .with_attribute("replication-factor", "3")
    }

    #[tokio::test]
    async fn test_overlay_overrides_present_attributes() {
        let mut config = BootstrapConfig::default();
        overlay_config(&mut config, &source()).await.unwrap();

        assert_eq!(config.broker_count, 5);
        assert_eq!(config.name_prefix, "acme");
        assert_eq!(config.kafka_version, "3.5.1");
        assert_eq!(config.replication_factor, 3);
        // absent attribute keeps its default
        assert_eq!(config.min_insync_replicas, 2);
        config.validate().unwrap();
    }

    #[tokio::test]
    async fn test_overlay_rejects_non_numeric_attribute() {
        let source = source().with_attribute("broker-count", "three");
        let mut config = BootstrapConfig::default();
        let err = overlay_config(&mut config, &source).await.unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
