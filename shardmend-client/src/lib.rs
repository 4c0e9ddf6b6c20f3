//! shardmend cluster client
//!
//! Thin HTTP collaborator for a document-store cluster. It exposes the three
//! calls the rebalancer needs:
//! - `GET /_cat/nodes` (node names and roles)
//! - `GET /_cat/shards` (shard allocations)
//! - `POST /_cluster/reroute` (allocate-empty-primary commands)
//!
//! Records are returned exactly as the cluster reports them; numeric fields
//! stay strings and are interpreted by the caller.

pub mod client;
pub mod types;

pub use client::{ClientError, ClusterClient, Result, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
pub use types::{NodeRecord, RerouteCommand, RerouteRequest, RerouteResponse, ShardRecord};
