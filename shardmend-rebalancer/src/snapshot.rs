//! Cluster Snapshot
//!
//! Turns raw `_cat/nodes` and `_cat/shards` listings into the topology the
//! planner works on:
//! - Eligible data nodes
//! - Unassigned replica shards, in listing order
//! - Initial per-node replica counts

use shardmend_client::{NodeRecord, ShardRecord};
use std::fmt;
use tracing::{debug, info, instrument, warn};

use crate::error::{RebalanceError, Result};
use crate::planner::LoadModel;

/// Node role as far as placement is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Master,
    Data,
}

impl NodeRole {
    /// Only the exact role string `"m"` is master-only
    pub fn from_cat(role: &str) -> Self {
        if role == "m" {
            Self::Master
        } else {
            Self::Data
        }
    }
}

/// A cluster node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub ip: Option<String>,
    pub role: NodeRole,
}

impl Node {
    pub fn is_data_node(&self) -> bool {
        self.role == NodeRole::Data
    }
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        Self {
            role: NodeRole::from_cat(&record.node_role),
            name: record.name,
            ip: record.ip,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardRole {
    Primary,
    Replica,
}

impl ShardRole {
    pub fn from_cat(prirep: &str) -> Self {
        if prirep == "p" {
            Self::Primary
        } else {
            Self::Replica
        }
    }
}

/// A shard copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    pub index: String,
    pub number: u32,
    pub role: ShardRole,
    /// Lifecycle state as reported, e.g. `STARTED` or `UNASSIGNED`
    pub state: String,
    /// `None` while the copy is unassigned
    pub docs: Option<u64>,
    pub store: Option<String>,
    pub ip: Option<String>,
    /// Hosting node, `None` when unassigned. For a relocating copy this is
    /// the source node.
    pub node: Option<String>,
    /// Where a relocating copy is headed, as reported after the `->`
    pub relocating_to: Option<String>,
    pub unassigned_reason: Option<String>,
}

impl Shard {
    /// Convert a listing row, parsing its numeric fields
    pub fn from_record(record: ShardRecord) -> Result<Self> {
        let number = record.shard.trim().parse::<u32>().map_err(|_| {
            RebalanceError::Fetch(format!(
                "invalid shard number {:?} for index {}",
                record.shard, record.index
            ))
        })?;

        let docs = match non_empty(record.docs) {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                RebalanceError::Fetch(format!(
                    "invalid document count {:?} for shard {}/{}",
                    raw, record.index, number
                ))
            })?),
            None => None,
        };

        let (node, relocating_to) = match non_empty(record.node) {
            Some(raw) => split_relocation(&raw),
            None => (None, None),
        };

        Ok(Self {
            role: ShardRole::from_cat(&record.prirep),
            index: record.index,
            number,
            state: record.state,
            docs,
            store: non_empty(record.store),
            ip: non_empty(record.ip),
            node,
            relocating_to,
            unassigned_reason: non_empty(record.unassigned_reason),
        })
    }

    pub fn is_replica(&self) -> bool {
        self.role == ShardRole::Replica
    }

    pub fn is_unassigned(&self) -> bool {
        self.node.is_none()
    }

    pub fn is_relocating(&self) -> bool {
        self.relocating_to.is_some()
    }

    /// Record the node a confirmed reroute placed this copy on
    pub fn assign_to(&mut self, node: impl Into<String>) {
        self.node = Some(node.into());
    }
}

impl fmt::Display for Shard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.number)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A relocating copy is listed as `"src -> dst-ip dst-id dst"`; it still
/// counts against `src` until the move completes.
fn split_relocation(raw: &str) -> (Option<String>, Option<String>) {
    match raw.split_once(" -> ") {
        Some((source, target)) => (
            non_empty(Some(source.trim().to_string())),
            non_empty(Some(target.trim().to_string())),
        ),
        None => (Some(raw.trim().to_string()), None),
    }
}

/// What to do with a replica hosted on a node the node listing didn't return
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TopologyPolicy {
    /// Drop it from the load model, log a warning and record it
    #[default]
    Warn,
    /// Fail the snapshot with `InconsistentTopology`
    Strict,
}

/// A replica hosted on a node that isn't an eligible data node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inconsistency {
    pub index: String,
    pub shard: u32,
    pub node: String,
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} on {}", self.index, self.shard, self.node)
    }
}

/// Point-in-time view of the cluster for one run
#[derive(Debug, Clone, Default)]
pub struct ClusterSnapshot {
    pub nodes: Vec<Node>,
    /// Replica counts per eligible data node
    pub load: LoadModel,
    /// Unassigned replicas in listing order
    pub unassigned: Vec<Shard>,
    /// Replicas dropped from the load model under `TopologyPolicy::Warn`
    pub inconsistencies: Vec<Inconsistency>,
}

impl ClusterSnapshot {
    /// Build a snapshot from raw listings
    #[instrument(skip_all, fields(nodes = nodes.len(), shards = shards.len()))]
    pub fn build(
        nodes: Vec<NodeRecord>,
        shards: Vec<ShardRecord>,
        policy: TopologyPolicy,
    ) -> Result<Self> {
        let nodes: Vec<Node> = nodes.into_iter().map(Node::from).collect();

        let mut load = LoadModel::new(
            nodes
                .iter()
                .filter(|n| n.is_data_node())
                .map(|n| n.name.clone()),
        );

        let mut unassigned = Vec::new();
        let mut inconsistencies = Vec::new();

        for record in shards {
            let shard = Shard::from_record(record)?;

            // Primaries never count toward load
            if !shard.is_replica() {
                if shard.is_unassigned() {
                    debug!(shard = %shard, "Skipping unassigned primary");
                }
                continue;
            }

            if shard.is_unassigned() {
                unassigned.push(shard);
                continue;
            }

            let node = shard.node.as_deref().unwrap_or_default();
            if load.record_hosted(node).is_some() {
                continue;
            }

            match policy {
                TopologyPolicy::Strict => {
                    return Err(RebalanceError::InconsistentTopology {
                        node: node.to_string(),
                        index: shard.index,
                        shard: shard.number,
                    });
                }
                TopologyPolicy::Warn => {
                    warn!(
                        shard = %shard,
                        node = node,
                        "Replica hosted on a node missing from the node listing, not counted as load"
                    );
                    inconsistencies.push(Inconsistency {
                        index: shard.index.clone(),
                        shard: shard.number,
                        node: node.to_string(),
                    });
                }
            }
        }

        info!(
            data_nodes = load.len(),
            unassigned = unassigned.len(),
            inconsistencies = inconsistencies.len(),
            "Cluster snapshot built"
        );

        Ok(Self {
            nodes,
            load,
            unassigned,
            inconsistencies,
        })
    }

    /// Names of the nodes eligible to receive shards
    pub fn data_nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|n| n.is_data_node())
            .map(|n| n.name.as_str())
    }
}
