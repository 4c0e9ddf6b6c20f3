//! Wire types for the `_cat` listings and the reroute command.

use serde::{Deserialize, Serialize};

/// One row of `_cat/nodes?h=ip,node.role,name&format=json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default)]
    pub ip: Option<String>,
    /// Role letters, e.g. `"m"` for master-only or `"dim"` for data+ingest+master
    #[serde(rename = "node.role")]
    pub node_role: String,
    pub name: String,
}

/// One row of `_cat/shards?h=index,shard,prirep,state,docs,node,store,ip,unassigned.reason&format=json`
///
/// The cluster reports `null` for `docs`, `store`, `ip` and `node` while a
/// shard copy is unassigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRecord {
    pub index: String,
    pub shard: String,
    /// `"p"` for primary, `"r"` for replica
    pub prirep: String,
    pub state: String,
    #[serde(default)]
    pub docs: Option<String>,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(rename = "unassigned.reason", default)]
    pub unassigned_reason: Option<String>,
}

/// A single cluster reroute command.
///
/// Serialized externally tagged, so a variant becomes
/// `{"allocate_empty_primary": {...}}` inside the `commands` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RerouteCommand {
    /// Force an empty copy of the shard onto `node`. Any data not yet
    /// replicated is lost; the copy resynchronizes from the primary.
    AllocateEmptyPrimary {
        index: String,
        shard: u32,
        node: String,
        accept_data_loss: bool,
    },
}

impl RerouteCommand {
    /// Build an allocate-empty-primary command with data loss accepted
    pub fn allocate_empty_primary(
        index: impl Into<String>,
        shard: u32,
        node: impl Into<String>,
    ) -> Self {
        Self::AllocateEmptyPrimary {
            index: index.into(),
            shard,
            node: node.into(),
            accept_data_loss: true,
        }
    }

    pub fn index(&self) -> &str {
        match self {
            Self::AllocateEmptyPrimary { index, .. } => index,
        }
    }

    pub fn shard(&self) -> u32 {
        match self {
            Self::AllocateEmptyPrimary { shard, .. } => *shard,
        }
    }

    pub fn node(&self) -> &str {
        match self {
            Self::AllocateEmptyPrimary { node, .. } => node,
        }
    }
}

/// Body of `POST /_cluster/reroute`
#[derive(Debug, Serialize)]
pub struct RerouteRequest<'a> {
    pub commands: &'a [RerouteCommand],
}

/// The part of the reroute response we care about
#[derive(Debug, Clone, Deserialize)]
pub struct RerouteResponse {
    pub acknowledged: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_allocate_empty_primary_body() {
        let commands = [RerouteCommand::allocate_empty_primary("logs-2024", 3, "data-1")];
        let body = serde_json::to_value(RerouteRequest {
            commands: &commands,
        })
        .unwrap();

        assert_eq!(
            body,
            json!({
                "commands": [{
                    "allocate_empty_primary": {
                        "index": "logs-2024",
                        "shard": 3,
                        "node": "data-1",
                        "accept_data_loss": true
                    }
                }]
            })
        );
    }

    #[test]
    fn test_shard_record_with_nulls() {
        let raw = r#"{
            "index": "logs",
            "shard": "1",
            "prirep": "r",
            "state": "UNASSIGNED",
            "docs": null,
            "store": null,
            "ip": null,
            "node": null,
            "unassigned.reason": "NODE_LEFT"
        }"#;

        let record: ShardRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.node, None);
        assert_eq!(record.docs, None);
        assert_eq!(record.unassigned_reason.as_deref(), Some("NODE_LEFT"));
    }

    #[test]
    fn test_node_record_role_field() {
        let raw = r#"{"ip": "10.0.0.7", "node.role": "m", "name": "master-0"}"#;
        let record: NodeRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.node_role, "m");
        assert_eq!(record.name, "master-0");
    }

    #[test]
    fn test_reroute_response_ignores_extra_fields() {
        let raw = r#"{"acknowledged": false, "state": {"cluster_uuid": "abc"}}"#;
        let response: RerouteResponse = serde_json::from_str(raw).unwrap();
        assert!(!response.acknowledged);
    }
}
