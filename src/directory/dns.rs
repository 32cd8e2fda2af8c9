//! DNS-backed address directory
//!
//! Reserved internal addresses are registered in the VPC's internal DNS
//! under the instance name. A name that does not resolve yet maps onto the
//! retryable peer-unresolved condition rather than a hard failure, since
//! records may lag instance creation by a few seconds.

use std::net::IpAddr;

use crate::common::{Error, Result};
use crate::directory::AddressDirectory;

#[derive(Debug, Clone, Default)]
pub struct DnsDirectory;

impl DnsDirectory {
    pub fn new() -> Self {
        Self
    }
}

impl AddressDirectory for DnsDirectory {
    async fn resolve(&self, name: &str) -> Result<IpAddr> {
        // lookup_host needs a port; it is discarded with the SocketAddr.
        let query = format!("{}:0", name);
        let mut addrs = tokio::net::lookup_host(query).await.map_err(|e| {
            tracing::debug!("DNS lookup for {} failed: {}", name, e);
            Error::PeerUnresolved {
                name: name.to_string(),
                attempts: 1,
            }
        })?;

        addrs
            .next()
            .map(|sock| sock.ip())
            .ok_or_else(|| Error::PeerUnresolved {
                name: name.to_string(),
                attempts: 1,
            })
    }
}
