//! Bootstrap binary

use clap::{Parser, Subcommand};
use kraft_bootstrap::bootstrap::{derive_voters, format_voters, Coordinator, StatusReport};
use kraft_bootstrap::common::{BootstrapConfig, Outcome};
use kraft_bootstrap::directory::DnsDirectory;
use kraft_bootstrap::metadata::{overlay_config, GceMetadata};
use kraft_bootstrap::ops::check_cluster;
use kraft_bootstrap::system::SystemHost;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kraft-bootstrap")]
#[command(about = "KRaft cluster bootstrap coordinator for Kafka broker VMs")]
#[command(version)]
struct Cli {
    /// Config file (TOML); defaults to /etc/kraft-bootstrap.toml if present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full bootstrap on this instance
    Run,

    /// Validate configuration and preview derived values, no side effects
    Validate {
        /// Skip the instance metadata overlay (file/env config only)
        #[arg(long)]
        no_metadata: bool,

        /// Also resolve peers and print the derived voter string
        #[arg(long)]
        voters: bool,
    },

    /// Print the persisted terminal status report
    Status,

    /// Probe every broker's client and controller ports
    Check {
        /// Per-probe timeout in seconds
        #[arg(long, default_value = "5")]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = BootstrapConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => {
            let metadata = GceMetadata::new()?;
            overlay_config(&mut config, &metadata).await?;

            tracing::info!("kraft-bootstrap {}", kraft_bootstrap::VERSION);
            let coordinator =
                Coordinator::new(config, metadata, DnsDirectory::new(), SystemHost::new()?);
            let report = coordinator.run().await;

            print_report(&report);
            if report.outcome != Outcome::Success {
                std::process::exit(1);
            }
        }

        Commands::Validate { no_metadata, voters } => {
            if !no_metadata {
                let metadata = GceMetadata::new()?;
                overlay_config(&mut config, &metadata).await?;
            }
            config.validate()?;

            println!("configuration OK");
            println!("  cluster size:        {}", config.broker_count);
            println!("  kafka version:       {}", config.kafka_version);
            println!("  default partitions:  {}", config.default_partitions);
            println!("  replication factor:  {}", config.replication_factor);
            println!("  min insync replicas: {}", config.min_insync_replicas);
            println!(
                "  brokers:             {} .. {}",
                config.broker_name(0),
                config.broker_name(config.broker_count - 1)
            );
            println!("  distribution:        {}", config.download_url());

            if voters {
                let derived = derive_voters(&config, &DnsDirectory::new()).await?;
                println!("  quorum voters:       {}", format_voters(&derived));
            }
        }

        Commands::Status => {
            let report = StatusReport::read(&config.status_path())?;
            print_report(&report);
            if report.outcome != Outcome::Success {
                std::process::exit(1);
            }
        }

        Commands::Check { timeout_secs } => {
            config.validate()?;
            let report = check_cluster(
                &config,
                &DnsDirectory::new(),
                Duration::from_secs(timeout_secs),
            )
            .await;

            for broker in &report.brokers {
                let addr = broker
                    .address
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "unresolved".to_string());
                println!(
                    "{:<24} {:<16} client: {:<4} controller: {}",
                    broker.name,
                    addr,
                    if broker.client_reachable { "ok" } else { "FAIL" },
                    if broker.controller_reachable { "ok" } else { "FAIL" },
                );
            }
            if !report.all_healthy() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn print_report(report: &StatusReport) {
    println!("outcome:  {}", report.outcome);
    println!("phase:    {}", report.phase);
    if let Some(node_id) = report.node_id {
        println!("node id:  {}", node_id);
    }
    println!("message:  {}", report.message);
    println!("finished: {}", report.finished_at.to_rfc3339());
}
