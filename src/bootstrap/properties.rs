//! Broker configuration rendering
//!
//! `server.properties` is rendered from a fixed template: own node ID, the
//! full voter string, own internal address for the advertised listener, and
//! the cluster-wide topic defaults passed through unchanged.

use crate::common::BootstrapConfig;

use super::identity::BrokerIdentity;
use super::quorum::{format_voters, QuorumVoter};

/// Render the combined broker+controller KRaft configuration.
pub fn render_server_properties(
    config: &BootstrapConfig,
    identity: &BrokerIdentity,
    voters: &[QuorumVoter],
) -> String {
    let mut out = String::new();

    out.push_str("# KRaft combined broker/controller configuration\n");
    out.push_str(&format!("# rendered for {}\n\n", identity.name));

    out.push_str("process.roles=broker,controller\n");
    out.push_str(&format!("node.id={}\n", identity.node_id()));
    out.push_str(&format!(
        "controller.quorum.voters={}\n\n",
        format_voters(voters)
    ));

    out.push_str(&format!(
        "listeners=PLAINTEXT://0.0.0.0:{},CONTROLLER://0.0.0.0:{}\n",
        config.client_port, config.controller_port
    ));
    out.push_str("inter.broker.listener.name=PLAINTEXT\n");
    out.push_str(&format!(
        "advertised.listeners=PLAINTEXT://{}:{}\n",
        identity.address, config.client_port
    ));
    out.push_str("controller.listener.names=CONTROLLER\n");
    out.push_str("listener.security.protocol.map=CONTROLLER:PLAINTEXT,PLAINTEXT:PLAINTEXT\n\n");

    out.push_str(&format!("log.dirs={}\n", config.data_dir.display()));
    out.push_str(&format!("num.partitions={}\n", config.default_partitions));
    out.push_str(&format!(
        "default.replication.factor={}\n",
        config.replication_factor
    ));
    out.push_str(&format!(
        "min.insync.replicas={}\n",
        config.min_insync_replicas
    ));
    out.push_str(&format!(
        "offsets.topic.replication.factor={}\n",
        config.replication_factor
    ));
    out.push_str(&format!(
        "transaction.state.log.replication.factor={}\n",
        config.replication_factor
    ));
    out.push_str(&format!(
        "transaction.state.log.min.isr={}\n",
        config.min_insync_replicas
    ));

    out
}

/// Render the systemd unit supervising the broker process. Restart policy
/// is process-level only; the unit never re-runs bootstrap steps.
pub fn render_service_unit(config: &BootstrapConfig) -> String {
    format!(
        "[Unit]\n\
         Description=Apache Kafka broker (KRaft mode)\n\
         After=network-online.target\n\
         Wants=network-online.target\n\
         \n\
         [Service]\n\
         Type=simple\n\
         User={user}\n\
         ExecStart={install}/bin/kafka-server-start.sh {server_config}\n\
         Restart=on-failure\n\
         RestartSec=5\n\
         LimitNOFILE=100000\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n",
        user = config.service_user,
        install = config.install_dir.display(),
        server_config = config.server_config_path.display(),
    )
}

/// Unit file name under /etc/systemd/system.
pub const SERVICE_UNIT: &str = "kafka.service";

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (BootstrapConfig, BrokerIdentity, Vec<QuorumVoter>) {
        let config = BootstrapConfig {
            broker_count: 3,
            name_prefix: "acme".into(),
            ..Default::default()
        };
        let identity = BrokerIdentity::new("acme-broker-1", "10.0.0.3".parse().unwrap()).unwrap();
        let voters = (0..3u32)
            .map(|i| QuorumVoter {
                node_id: i,
                address: format!("10.0.0.{}", i + 2).parse().unwrap(),
                port: 9093,
            })
            .collect();
        (config, identity, voters)
    }

    #[test]
    fn test_server_properties_substitutions() {
        let (config, identity, voters) = fixture();
        let props = render_server_properties(&config, &identity, &voters);

        assert!(props.contains("node.id=1\n"));
        assert!(props.contains(
            "controller.quorum.voters=0@10.0.0.2:9093,1@10.0.0.3:9093,2@10.0.0.4:9093\n"
        ));
        assert!(props.contains("advertised.listeners=PLAINTEXT://10.0.0.3:9092\n"));
        assert!(props.contains("num.partitions=6\n"));
        assert!(props.contains("default.replication.factor=3\n"));
        assert!(props.contains("min.insync.replicas=2\n"));
        assert!(props.contains("log.dirs=/var/lib/kafka/data\n"));
    }

    #[test]
    fn test_service_unit_substitutions() {
        let (config, _, _) = fixture();
        let unit = render_service_unit(&config);

        assert!(unit.contains("User=kafka\n"));
        assert!(unit.contains(
            "ExecStart=/opt/kafka/bin/kafka-server-start.sh /opt/kafka/config/kraft/server.properties\n"
        ));
        assert!(unit.contains("Restart=on-failure\n"));
    }
}
