//! shardmend Rebalancer Library
//!
//! Reassigns unassigned replica shards of a document-store cluster to the
//! data nodes hosting the fewest replicas.
//!
//! A run:
//! - Builds a snapshot from the node and shard listings
//! - Picks the least-loaded data node for each unassigned replica
//! - Forces each replica there with an allocate-empty-primary reroute
//!
//! Runs are strictly sequential and stop at the first failure. Re-running
//! after a partial run is safe: placed shards are no longer unassigned.

pub mod cluster_client;
pub mod config;
pub mod error;
pub mod executor;
pub mod planner;
pub mod snapshot;

use shardmend_client::{NodeRecord, ShardRecord};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, instrument};

// Re-export main types
pub use cluster_client::ClusterApi;
pub use config::{ConfigError, RebalancerConfig};
pub use error::{RebalanceError, Result};
pub use executor::{Orchestrator, OrchestratorConfig, PlacementState, RunReport};
pub use planner::{Assignment, LoadModel, Planner};
pub use snapshot::{ClusterSnapshot, Inconsistency, Node, NodeRole, Shard, ShardRole, TopologyPolicy};

/// Options for one rebalancing run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebalanceOptions {
    pub policy: TopologyPolicy,
    pub dry_run: bool,
}

/// Result of a rebalancing run
#[derive(Debug, Default)]
pub struct RebalanceOutcome {
    /// Confirmed (or, in dry-run mode, planned) placements in order
    pub assignments: Vec<Assignment>,
    /// Unassigned replicas found in the snapshot
    pub unassigned: usize,
    /// Replicas hosted on nodes missing from the node listing
    pub inconsistencies: Vec<Inconsistency>,
    /// First fatal error, if the run stopped early
    pub error: Option<RebalanceError>,
    pub dry_run: bool,
}

impl RebalanceOutcome {
    fn failed(error: RebalanceError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    /// Number of shards relocated
    pub fn placed(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.placed() == self.unassigned
    }

    pub fn summary(&self) -> String {
        format!(
            "{} of {} unassigned replicas placed{}, {} inconsistencies",
            self.placed(),
            self.unassigned,
            if self.dry_run { " (dry run)" } else { "" },
            self.inconsistencies.len()
        )
    }
}

/// Runs snapshot, planning and reroutes with a shared shutdown flag
pub struct Rebalancer {
    options: RebalanceOptions,
    shutdown: Arc<AtomicBool>,
}

impl Rebalancer {
    pub fn new(options: RebalanceOptions) -> Self {
        Self {
            options,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops a run before its next reroute once set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Rebalance from pre-fetched listings
    #[instrument(skip_all, fields(dry_run = self.options.dry_run))]
    pub async fn run<A>(
        &self,
        nodes: Vec<NodeRecord>,
        shards: Vec<ShardRecord>,
        api: &A,
    ) -> RebalanceOutcome
    where
        A: ClusterApi + ?Sized,
    {
        let snapshot = match ClusterSnapshot::build(nodes, shards, self.options.policy) {
            Ok(snapshot) => snapshot,
            Err(e) => return RebalanceOutcome::failed(e),
        };

        info!("There are {} unassigned shards", snapshot.unassigned.len());

        let ClusterSnapshot {
            mut load,
            mut unassigned,
            inconsistencies,
            ..
        } = snapshot;

        let orchestrator = Orchestrator::with_shutdown(
            OrchestratorConfig {
                dry_run: self.options.dry_run,
            },
            self.shutdown.clone(),
        );
        let report = orchestrator.run(&mut load, &mut unassigned, api).await;

        RebalanceOutcome {
            assignments: report.assignments,
            unassigned: unassigned.len(),
            inconsistencies,
            error: report.error,
            dry_run: report.dry_run,
        }
    }

    /// Fetch both listings from `api`, then rebalance
    pub async fn fetch_and_run<A>(&self, api: &A) -> RebalanceOutcome
    where
        A: ClusterApi + ?Sized,
    {
        info!("Listing available nodes");
        let nodes = match api.list_nodes().await {
            Ok(nodes) => nodes,
            Err(e) => return RebalanceOutcome::failed(e),
        };

        info!("Listing shard allocations");
        let shards = match api.list_shards().await {
            Ok(shards) => shards,
            Err(e) => return RebalanceOutcome::failed(e),
        };

        self.run(nodes, shards, api).await
    }
}

/// Rebalance from pre-fetched listings with the given options
pub async fn run_rebalance<A>(
    nodes: Vec<NodeRecord>,
    shards: Vec<ShardRecord>,
    api: &A,
    options: RebalanceOptions,
) -> RebalanceOutcome
where
    A: ClusterApi + ?Sized,
{
    Rebalancer::new(options).run(nodes, shards, api).await
}

/// Fetch listings from `api` and rebalance with the given options
pub async fn fetch_and_rebalance<A>(api: &A, options: RebalanceOptions) -> RebalanceOutcome
where
    A: ClusterApi + ?Sized,
{
    Rebalancer::new(options).fetch_and_run(api).await
}
