//! shardmend
//!
//! Finds unassigned replica shards and forces each onto the data node
//! currently hosting the fewest replicas, one allocate-empty-primary reroute
//! at a time.
//!
//! Placed replicas start empty and resynchronize from their primary.

use anyhow::Context;
use clap::Parser;
use std::sync::atomic::Ordering;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shardmend_client::ClusterClient;
use shardmend_rebalancer::{ConfigError, Rebalancer, RebalancerConfig};

#[derive(Parser)]
#[command(name = "shardmend")]
#[command(about = "Reassign unassigned replica shards to the least-loaded data nodes")]
#[command(version)]
struct Cli {
    /// Cluster endpoint, host:port or URL (overrides SHARDMEND_ENDPOINT)
    #[arg(value_name = "ENDPOINT")]
    endpoint: Option<String>,

    /// Cluster endpoint given as a flag instead of positionally
    #[arg(long = "endpoint", value_name = "ENDPOINT", conflicts_with = "endpoint")]
    endpoint_flag: Option<String>,

    /// Connect and request timeout in seconds (overrides SHARDMEND_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Plan and log placements without submitting reroutes
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Fail when a shard is hosted on a node missing from the node listing
    #[arg(long, default_value = "false")]
    strict_topology: bool,

    /// Log level, used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    /// Override `config` with the flags given, then re-check it
    fn apply(&self, config: &mut RebalancerConfig) -> Result<(), ConfigError> {
        if let Some(endpoint) = self.endpoint.as_ref().or(self.endpoint_flag.as_ref()) {
            config.endpoint = endpoint.clone();
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
        config.dry_run |= self.dry_run;
        config.strict_topology |= self.strict_topology;

        config.validate()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_target(true)
        .init();

    let mut config = RebalancerConfig::from_env().context("Invalid configuration")?;
    cli.apply(&mut config).context("Invalid command line")?;

    info!(
        endpoint = %config.endpoint,
        timeout_secs = config.timeout_secs,
        dry_run = config.dry_run,
        strict_topology = config.strict_topology,
        "Starting shardmend"
    );

    let client = ClusterClient::new(&config.endpoint, config.timeout())
        .context("Failed to create cluster client")?;

    let rebalancer = Rebalancer::new(config.options());

    // Stop between reroutes on Ctrl-C
    let shutdown = rebalancer.shutdown_handle();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            shutdown.store(true, Ordering::SeqCst);
        }
    });

    let outcome = rebalancer.fetch_and_run(&client).await;

    for inconsistency in &outcome.inconsistencies {
        warn!(shard = %inconsistency, "Replica on unknown node was not counted as load");
    }

    info!(summary = %outcome.summary(), "Rebalance finished");

    if let Some(e) = outcome.error {
        anyhow::bail!(
            "Rebalance stopped after placing {} shards: {}",
            outcome.assignments.len(),
            e
        );
    }

    Ok(())
}
