//! Cluster connectivity check
//!
//! Resolves every declared broker through the directory and probes its
//! client and controller ports with a bounded per-probe timeout. Meant for
//! external health tooling after bootstrap has reported success.

use serde::Serialize;
use std::net::IpAddr;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::common::BootstrapConfig;
use crate::directory::AddressDirectory;

#[derive(Debug, Clone, Serialize)]
pub struct BrokerProbe {
    pub ordinal: u32,
    pub name: String,
    pub address: Option<IpAddr>,
    pub client_reachable: bool,
    pub controller_reachable: bool,
}

impl BrokerProbe {
    pub fn healthy(&self) -> bool {
        self.address.is_some() && self.client_reachable && self.controller_reachable
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub brokers: Vec<BrokerProbe>,
}

impl HealthReport {
    pub fn all_healthy(&self) -> bool {
        !self.brokers.is_empty() && self.brokers.iter().all(|b| b.healthy())
    }
}

/// Probe every broker in the declared cluster. Unresolvable or unreachable
/// brokers are reported, not errored, so one dead broker does not hide the
/// state of the rest.
pub async fn check_cluster<D: AddressDirectory>(
    config: &BootstrapConfig,
    directory: &D,
    probe_timeout: Duration,
) -> HealthReport {
    let mut brokers = Vec::with_capacity(config.broker_count as usize);

    for ordinal in 0..config.broker_count {
        let name = config.broker_fqdn(ordinal);
        let probe = match directory.resolve(&name).await {
            Ok(address) => BrokerProbe {
                ordinal,
                name,
                address: Some(address),
                client_reachable: probe_port(address, config.client_port, probe_timeout).await,
                controller_reachable: probe_port(address, config.controller_port, probe_timeout)
                    .await,
            },
            Err(e) => {
                tracing::warn!("broker {} not resolvable: {}", name, e);
                BrokerProbe {
                    ordinal,
                    name,
                    address: None,
                    client_reachable: false,
                    controller_reachable: false,
                }
            }
        };
        brokers.push(probe);
    }

    HealthReport { brokers }
}

async fn probe_port(address: IpAddr, port: u16, probe_timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(probe_timeout, TcpStream::connect((address, port))).await,
        Ok(Ok(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticDirectory;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_against_listening_ports() {
        let client = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let controller = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let config = BootstrapConfig {
            broker_count: 1,
            name_prefix: "t".into(),
            client_port: client.local_addr().unwrap().port(),
            controller_port: controller.local_addr().unwrap().port(),
            ..Default::default()
        };

        let dir = StaticDirectory::new();
        dir.insert("t-broker-0", "127.0.0.1".parse().unwrap());

        let report = check_cluster(&config, &dir, Duration::from_millis(500)).await;
        assert!(report.all_healthy());
        assert!(report.brokers[0].client_reachable);
        assert!(report.brokers[0].controller_reachable);
    }

    #[tokio::test]
    async fn test_unresolved_broker_reported_unhealthy() {
        let config = BootstrapConfig {
            broker_count: 2,
            name_prefix: "t".into(),
            ..Default::default()
        };

        let dir = StaticDirectory::new();
        dir.insert("t-broker-0", "127.0.0.1".parse().unwrap());
        // t-broker-1 never registered

        let report = check_cluster(&config, &dir, Duration::from_millis(50)).await;
        assert!(!report.all_healthy());
        assert_eq!(report.brokers.len(), 2);
        assert!(report.brokers[1].address.is_none());
    }
}
