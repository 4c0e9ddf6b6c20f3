//! Placement Planner
//!
//! Picks the target node for each unassigned replica:
//! - Least replicas hosted wins
//! - Ties go to the lexicographically smallest node name
//!
//! The planner only reads the load model. Counts are bumped by whoever
//! confirms a placement, so a failed reroute never counts as load.

use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

use crate::error::{RebalanceError, Result};
use crate::snapshot::Shard;

/// Replica shard counts per eligible data node
///
/// The key set is fixed at construction; counts only ever go up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadModel {
    counts: BTreeMap<String, usize>,
}

impl LoadModel {
    /// Create a model with every node at zero
    pub fn new<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            counts: nodes.into_iter().map(|n| (n.into(), 0)).collect(),
        }
    }

    /// Count a replica already hosted on `node`. Returns `None` for unknown nodes.
    pub(crate) fn record_hosted(&mut self, node: &str) -> Option<usize> {
        self.increment(node)
    }

    /// Count a confirmed placement on `node`, returning its new count.
    /// Unknown nodes are never added.
    pub fn record_placement(&mut self, node: &str) -> Option<usize> {
        self.increment(node)
    }

    fn increment(&mut self, node: &str) -> Option<usize> {
        let count = self.counts.get_mut(node)?;
        *count += 1;
        Some(*count)
    }

    pub fn count(&self, node: &str) -> Option<usize> {
        self.counts.get(node).copied()
    }

    /// Node names in ascending order
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(n, c)| (n.as_str(), *c))
    }

    /// Sum of all counts
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// A placement decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub index: String,
    pub shard: u32,
    pub target: String,
}

impl Assignment {
    pub fn new(shard: &Shard, target: impl Into<String>) -> Self {
        Self {
            index: shard.index.clone(),
            shard: shard.number,
            target: target.into(),
        }
    }
}

/// Placement planner
#[derive(Debug, Clone, Default)]
pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Self
    }

    /// Least-loaded node, minimum of (count, name)
    pub fn next_target(&self, load: &LoadModel) -> Result<String> {
        load.iter()
            .min_by_key(|&(name, count)| (count, name))
            .map(|(name, _)| name.to_string())
            .ok_or(RebalanceError::NoEligibleNodes)
    }

    /// Plan every shard in `shards` assuming each placement succeeds.
    ///
    /// Works on a copy of `load`; the caller's model is untouched.
    #[instrument(skip_all, fields(shards = shards.len()))]
    pub fn plan(&self, load: &LoadModel, shards: &[Shard]) -> Result<Vec<Assignment>> {
        let mut load = load.clone();
        let mut assignments = Vec::with_capacity(shards.len());

        for shard in shards {
            let target = self.next_target(&load)?;
            load.record_placement(&target);

            debug!(shard = %shard, target = %target, "Planned placement");
            assignments.push(Assignment::new(shard, target));
        }

        info!(assignments = assignments.len(), "Placement plan created");

        Ok(assignments)
    }
}
