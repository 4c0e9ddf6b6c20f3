//! Reroute Orchestrator
//!
//! Places unassigned replicas one at a time:
//! - Ask the planner for the least-loaded node
//! - Submit an allocate-empty-primary reroute
//! - Count the placement only once the cluster acknowledged it
//!
//! The first failure ends the run. Earlier reroutes are already committed on
//! the cluster and are not rolled back.

use shardmend_client::RerouteCommand;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::cluster_client::ClusterApi;
use crate::error::{RebalanceError, Result};
use crate::planner::{Assignment, LoadModel, Planner};
use crate::snapshot::Shard;

/// Per-shard placement state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementState {
    Planning,
    Submitting,
    Applied,
    Failed,
}

/// Outcome of one orchestrator run
#[derive(Debug, Default)]
pub struct RunReport {
    /// Confirmed placements, in order
    pub assignments: Vec<Assignment>,
    /// Shards never attempted
    pub skipped: usize,
    /// Error that stopped the run
    pub error: Option<RebalanceError>,
    /// Nothing was submitted to the cluster
    pub dry_run: bool,
}

impl RunReport {
    pub fn placed(&self) -> usize {
        self.assignments.len()
    }

    /// True if every shard was placed
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.skipped == 0
    }

    pub fn summary(&self) -> String {
        let mode = if self.dry_run { " (dry run)" } else { "" };
        match &self.error {
            Some(e) => format!(
                "{} placed, {} skipped, stopped: {}{}",
                self.placed(),
                self.skipped,
                e,
                mode
            ),
            None => format!("{} placed, {} skipped{}", self.placed(), self.skipped, mode),
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// Plan and log only, never submit
    pub dry_run: bool,
}

/// Reroute orchestrator
pub struct Orchestrator {
    config: OrchestratorConfig,
    planner: Planner,
    /// Checked between shards
    shutdown: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self::with_shutdown(config, Arc::new(AtomicBool::new(false)))
    }

    /// Create an orchestrator that stops before the next shard once `shutdown` is set
    pub fn with_shutdown(config: OrchestratorConfig, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            config,
            planner: Planner::new(),
            shutdown,
        }
    }

    /// Place `shards` in order, updating `load` after each confirmed reroute.
    ///
    /// A placed shard gets its hosting node set. In dry-run mode the whole
    /// queue is planned up front, nothing is submitted, shards are left
    /// untouched and only `load` tracks the simulated placements.
    #[instrument(skip_all, fields(shards = shards.len(), dry_run = self.config.dry_run))]
    pub async fn run<A>(&self, load: &mut LoadModel, shards: &mut [Shard], api: &A) -> RunReport
    where
        A: ClusterApi + ?Sized,
    {
        let report = if self.config.dry_run {
            self.simulate(load, shards)
        } else {
            self.execute(load, shards, api).await
        };

        info!(summary = %report.summary(), "Reroute run finished");

        report
    }

    async fn execute<A>(&self, load: &mut LoadModel, shards: &mut [Shard], api: &A) -> RunReport
    where
        A: ClusterApi + ?Sized,
    {
        let mut report = RunReport::default();
        let total = shards.len();

        for (position, shard) in shards.iter_mut().enumerate() {
            if self.shutdown.load(Ordering::SeqCst) {
                report.skipped = total - position;
                warn!(remaining = report.skipped, "Shutdown requested, stopping");
                break;
            }

            match self.place(load, shard, api).await {
                Ok(assignment) => report.assignments.push(assignment),
                Err(e) => {
                    error!(shard = %shard, error = %e, "Reroute failed");
                    report.skipped = total - position - 1;
                    report.error = Some(e);
                    break;
                }
            }
        }

        report
    }

    fn simulate(&self, load: &mut LoadModel, shards: &[Shard]) -> RunReport {
        let mut report = RunReport {
            dry_run: true,
            ..Default::default()
        };

        match self.planner.plan(load, shards) {
            Ok(assignments) => {
                for assignment in &assignments {
                    info!(
                        index = %assignment.index,
                        shard = assignment.shard,
                        target = %assignment.target,
                        "Would reroute shard"
                    );
                    load.record_placement(&assignment.target);
                }
                report.assignments = assignments;
            }
            Err(e) => {
                // The node set is fixed, so planning can only fail on the first shard
                error!(error = %e, "Planning failed");
                report.skipped = shards.len().saturating_sub(1);
                report.error = Some(e);
            }
        }

        report
    }

    async fn place<A>(&self, load: &mut LoadModel, shard: &mut Shard, api: &A) -> Result<Assignment>
    where
        A: ClusterApi + ?Sized,
    {
        transition(shard, None, PlacementState::Planning);
        let target = match self.planner.next_target(load) {
            Ok(target) => target,
            Err(e) => {
                transition(shard, None, PlacementState::Failed);
                return Err(e);
            }
        };

        info!(
            index = %shard.index,
            shard = shard.number,
            target = %target,
            "Rerouting shard"
        );

        transition(shard, Some(&target), PlacementState::Submitting);
        let command = RerouteCommand::allocate_empty_primary(&shard.index, shard.number, &target);
        if let Err(e) = api.submit_reroute(&command).await {
            transition(shard, Some(&target), PlacementState::Failed);
            return Err(e);
        }

        load.record_placement(&target);
        shard.assign_to(&target);
        transition(shard, Some(&target), PlacementState::Applied);

        Ok(Assignment::new(shard, target))
    }
}

fn transition(shard: &Shard, target: Option<&str>, state: PlacementState) {
    debug!(shard = %shard, target = target.unwrap_or("-"), state = ?state, "Placement state");
}
