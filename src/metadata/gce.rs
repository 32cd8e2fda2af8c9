//! GCE metadata server client
//!
//! The metadata server is plain HTTP on a link-local endpoint and requires
//! the `Metadata-Flavor: Google` header on every request. A 404 on an
//! attribute means the provisioner never set it.

use std::net::IpAddr;
use std::time::Duration;

use crate::common::{Error, Result};
use crate::metadata::MetadataSource;

const DEFAULT_BASE: &str = "http://metadata.google.internal/computeMetadata/v1";
const FLAVOR_HEADER: &str = "Metadata-Flavor";
const FLAVOR_VALUE: &str = "Google";

pub struct GceMetadata {
    client: reqwest::Client,
    base: String,
}

impl GceMetadata {
    pub fn new() -> Result<Self> {
        Self::with_base(DEFAULT_BASE)
    }

    /// Override the endpoint, used by tests against a local stub server.
    pub fn with_base(base: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            base: base.into(),
        })
    }

    async fn get(&self, path: &str) -> Result<Option<String>> {
        let url = format!("{}{}", self.base, path);
        let resp = self
            .client
            .get(&url)
            .header(FLAVOR_HEADER, FLAVOR_VALUE)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp.error_for_status()?;
        Ok(Some(resp.text().await?.trim().to_string()))
    }
}

impl MetadataSource for GceMetadata {
    async fn attribute(&self, key: &str) -> Result<Option<String>> {
        self.get(&format!("/instance/attributes/{}", key)).await
    }

    async fn instance_name(&self) -> Result<String> {
        self.get("/instance/name")
            .await?
            .ok_or_else(|| Error::MissingAttribute("instance/name".into()))
    }

    async fn internal_address(&self) -> Result<IpAddr> {
        let raw = self
            .get("/instance/network-interfaces/0/ip")
            .await?
            .ok_or_else(|| Error::MissingAttribute("instance/network-interfaces/0/ip".into()))?;
        raw.parse().map_err(|_| {
            Error::MissingAttribute(format!("instance address is not an IP: {:?}", raw))
        })
    }
}
