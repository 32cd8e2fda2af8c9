//! Controller quorum derivation
//!
//! Each broker independently derives the cluster-wide voter set from the
//! same static ordinal → address mapping; the string is never transmitted
//! between brokers. Correctness therefore hinges on two things this module
//! enforces: every peer address must actually resolve before the set is
//! used (bounded retry with backoff per peer, replacing the source design's
//! blind sleep), and the derived set must pass a post-condition check
//! (count, density, distinct addresses) before any broker proceeds.

use std::collections::HashSet;
use std::net::IpAddr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::common::{retry_with_backoff, BootstrapConfig, Error, Result};
use crate::directory::AddressDirectory;

/// One member of the metadata consensus quorum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumVoter {
    pub node_id: u32,
    pub address: IpAddr,
    pub port: u16,
}

impl std::fmt::Display for QuorumVoter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.node_id, self.address, self.port)
    }
}

/// Resolve every declared broker through the directory, ordinal order.
///
/// Each peer lookup gets its own bounded retry budget; a peer that never
/// becomes resolvable surfaces the final [`Error::PeerUnresolved`] with the
/// attempt count, which classifies as a detected race rather than a silent
/// partial voter set.
pub async fn derive_voters<D: AddressDirectory>(
    config: &BootstrapConfig,
    directory: &D,
) -> Result<Vec<QuorumVoter>> {
    let policy = config.retry.policy();
    let mut voters = Vec::with_capacity(config.broker_count as usize);

    for ordinal in 0..config.broker_count {
        let name = config.broker_fqdn(ordinal);
        tracing::debug!("resolving voter {} ({})", ordinal, name);

        let address = retry_with_backoff(&policy, "peer lookup", || directory.resolve(&name))
            .await
            .map_err(|e| match e {
                Error::PeerUnresolved { name, .. } => Error::PeerUnresolved {
                    name,
                    attempts: policy.max_attempts,
                },
                other => other,
            })?;

        voters.push(QuorumVoter {
            node_id: ordinal,
            address,
            port: config.controller_port,
        });
    }

    verify_voters(&voters, config.broker_count as usize)?;
    Ok(voters)
}

/// Post-condition check on a derived voter set: exactly the declared number
/// of voters, dense node IDs in ordinal order, pairwise-distinct addresses.
pub fn verify_voters(voters: &[QuorumVoter], expected: usize) -> Result<()> {
    if voters.len() != expected {
        return Err(Error::IncompleteQuorum {
            expected,
            actual: voters.len(),
        });
    }

    for (i, voter) in voters.iter().enumerate() {
        if voter.node_id as usize != i {
            return Err(Error::QuorumInconsistent(format!(
                "node IDs not dense: position {} holds node {}",
                i, voter.node_id
            )));
        }
    }

    let mut seen = HashSet::new();
    for voter in voters {
        if !seen.insert(voter.address) {
            return Err(Error::QuorumInconsistent(format!(
                "duplicate voter address {}",
                voter.address
            )));
        }
    }

    Ok(())
}

/// Render the `controller.quorum.voters` value. Ordinal order is kept for
/// readability; the (id, address) set is what must match across brokers.
pub fn format_voters(voters: &[QuorumVoter]) -> String {
    voters
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Generate a fresh cluster identifier in the 22-character base64url form
/// the storage format tool expects.
pub fn generate_cluster_id() -> String {
    URL_SAFE_NO_PAD.encode(uuid::Uuid::new_v4().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticDirectory;

    fn config(broker_count: u32) -> BootstrapConfig {
        BootstrapConfig {
            broker_count,
            name_prefix: "prefix".into(),
            ..Default::default()
        }
    }

    fn seeded_directory(addresses: &[&str]) -> StaticDirectory {
        let dir = StaticDirectory::new();
        for (i, addr) in addresses.iter().enumerate() {
            dir.insert(format!("prefix-broker-{}", i), addr.parse().unwrap());
        }
        dir
    }

    #[tokio::test]
    async fn test_voter_string_derivation() {
        let dir = seeded_directory(&["10.0.0.2", "10.0.0.3", "10.0.0.4"]);
        let voters = derive_voters(&config(3), &dir).await.unwrap();

        assert_eq!(
            format_voters(&voters),
            "0@10.0.0.2:9093,1@10.0.0.3:9093,2@10.0.0.4:9093"
        );
    }

    #[tokio::test]
    async fn test_voter_set_identical_regardless_of_computing_broker() {
        // Every broker runs the same derivation against the same directory;
        // the rendered string must be byte-identical.
        let dir = seeded_directory(&["10.0.0.2", "10.0.0.3", "10.0.0.4"]);
        let config = config(3);

        let mut rendered = Vec::new();
        for _broker in 0..3 {
            let voters = derive_voters(&config, &dir).await.unwrap();
            rendered.push(format_voters(&voters));
        }
        assert!(rendered.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_unresolved_peer_is_terminal_after_retry_budget() {
        // broker-2 never registered
        let dir = seeded_directory(&["10.0.0.2", "10.0.0.3"]);
        let mut config = config(3);
        config.retry.max_attempts = 2;
        config.retry.init_backoff_ms = 1;
        config.retry.max_backoff_ms = 2;

        let err = derive_voters(&config, &dir).await.unwrap_err();
        match err {
            Error::PeerUnresolved { name, attempts } => {
                assert_eq!(name, "prefix-broker-2");
                assert_eq!(attempts, 2);
            }
            other => panic!("expected PeerUnresolved, got {:?}", other),
        }
    }

    #[test]
    fn test_verify_rejects_short_set() {
        let voters = vec![QuorumVoter {
            node_id: 0,
            address: "10.0.0.2".parse().unwrap(),
            port: 9093,
        }];
        let err = verify_voters(&voters, 3).unwrap_err();
        assert!(matches!(
            err,
            Error::IncompleteQuorum {
                expected: 3,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_verify_rejects_duplicate_addresses() {
        let addr: IpAddr = "10.0.0.2".parse().unwrap();
        let voters = vec![
            QuorumVoter {
                node_id: 0,
                address: addr,
                port: 9093,
            },
            QuorumVoter {
                node_id: 1,
                address: addr,
                port: 9093,
            },
        ];
        assert!(matches!(
            verify_voters(&voters, 2),
            Err(Error::QuorumInconsistent(_))
        ));
    }

    #[test]
    fn test_cluster_id_shape() {
        let id = generate_cluster_id();
        assert_eq!(id.len(), 22);
        assert!(!id.contains('='));
        assert_ne!(id, generate_cluster_id());
    }
}
