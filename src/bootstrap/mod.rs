//! Cluster bootstrap coordinator
//!
//! Brings a freshly created broker VM from bare OS to running KRaft cluster
//! member exactly once. Each broker's coordinator runs independently and
//! concurrently with its peers; the only synchronization is the shared
//! ordinal → address mapping in the directory, which every broker polls to
//! a confirmed rendezvous before using the derived voter set. Completed
//! steps are recorded in a local ledger so a re-run resumes instead of
//! repeating side effects.

pub mod identity;
pub mod properties;
pub mod quorum;
pub mod state;
pub mod status;

pub use identity::{parse_ordinal, BrokerIdentity};
pub use quorum::{derive_voters, format_voters, generate_cluster_id, verify_voters, QuorumVoter};
pub use state::{Phase, StateLedger};
pub use status::StatusReport;

use crate::common::{BootstrapConfig, Error, Result};
use crate::directory::AddressDirectory;
use crate::metadata::MetadataSource;
use crate::system::Host;

use properties::SERVICE_UNIT;

/// Single-run bootstrap coordinator for one broker VM.
pub struct Coordinator<M, D, H> {
    config: BootstrapConfig,
    metadata: M,
    directory: D,
    host: H,
}

impl<M, D, H> Coordinator<M, D, H>
where
    M: MetadataSource,
    D: AddressDirectory,
    H: Host,
{
    pub fn new(config: BootstrapConfig, metadata: M, directory: D, host: H) -> Self {
        Self {
            config,
            metadata,
            directory,
            host,
        }
    }

    /// Run the bootstrap to completion (or classified failure) and persist
    /// the terminal status report. Never panics; the report is the result.
    pub async fn run(&self) -> StatusReport {
        let mut node_id = None;

        let report = match StateLedger::open(self.config.ledger_path()) {
            Err(e) => StatusReport::failure(&e, Phase::NotStarted, None),
            Ok(mut ledger) => match self.execute(&mut ledger, &mut node_id).await {
                Ok(identity) => StatusReport::success(ledger.phase(), identity.node_id()),
                Err(e) => {
                    tracing::error!("bootstrap failed at {}: {}", ledger.phase(), e);
                    StatusReport::failure(&e, ledger.phase(), node_id)
                }
            },
        };

        if let Err(e) = report.write(&self.config.status_path()) {
            tracing::error!("cannot persist status report: {}", e);
        }
        report
    }

    async fn execute(
        &self,
        ledger: &mut StateLedger,
        node_id: &mut Option<u32>,
    ) -> Result<BrokerIdentity> {
        // invariants first, before any side effect
        self.config.validate()?;

        let name = self.metadata.instance_name().await?;
        let address = self.metadata.internal_address().await?;
        let identity = BrokerIdentity::new(name, address)?;
        *node_id = Some(identity.node_id());

        if identity.ordinal >= self.config.broker_count {
            return Err(Error::InvalidConfig(format!(
                "ordinal {} out of range for a cluster of {}",
                identity.ordinal, self.config.broker_count
            )));
        }

        tracing::info!(
            "bootstrapping {} in a cluster of {}, resuming after phase {}",
            identity,
            self.config.broker_count,
            ledger.phase()
        );

        if ledger.phase() < Phase::DependenciesInstalled {
            self.host.ensure_packages().await?;
            self.host.ensure_user(&self.config.service_user).await?;
            self.host.ensure_dirs(&self.config).await?;
            ledger.record(Phase::DependenciesInstalled)?;
        }

        if ledger.phase() < Phase::DistributionReady {
            self.host.fetch_distribution(&self.config).await?;
            ledger.record(Phase::DistributionReady)?;
        }

        if ledger.phase() < Phase::ConfigWritten {
            // rendezvous: every peer must resolve before the voter set is
            // used anywhere
            let voters = quorum::derive_voters(&self.config, &self.directory).await?;
            let props = properties::render_server_properties(&self.config, &identity, &voters);
            self.host
                .write_owned_file(
                    &self.config.server_config_path,
                    &props,
                    &self.config.service_user,
                )
                .await?;
            ledger.record(Phase::ConfigWritten)?;
        }

        if ledger.phase() < Phase::ServiceEnabled {
            let unit = properties::render_service_unit(&self.config);
            self.host.install_unit(SERVICE_UNIT, &unit).await?;
            ledger.record(Phase::ServiceEnabled)?;
        }

        if identity.is_first_node() && ledger.phase() < Phase::StorageFormatted {
            let cluster_id = quorum::generate_cluster_id();
            tracing::info!("formatting storage, cluster ID {}", cluster_id);
            self.host.format_storage(&self.config, &cluster_id).await?;
            ledger.record(Phase::StorageFormatted)?;
        }

        if ledger.phase() < Phase::Running {
            self.host.start_service(SERVICE_UNIT).await?;
            ledger.record(Phase::Running)?;
        }

        Ok(identity)
    }
}
