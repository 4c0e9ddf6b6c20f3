//! Cluster API seam
//!
//! The rebalancer talks to the cluster only through [`ClusterApi`]. The HTTP
//! implementation wraps `shardmend_client::ClusterClient`.

use shardmend_client::{ClientError, ClusterClient, NodeRecord, RerouteCommand, ShardRecord};
use tracing::instrument;

use crate::error::{RebalanceError, Result};

/// Operations the rebalancer needs from the cluster
#[async_trait::async_trait]
pub trait ClusterApi: Send + Sync {
    /// List all cluster nodes
    async fn list_nodes(&self) -> Result<Vec<NodeRecord>>;

    /// List all shard copies and where they live
    async fn list_shards(&self) -> Result<Vec<ShardRecord>>;

    /// Submit one reroute command, succeeding only if it was acknowledged
    async fn submit_reroute(&self, command: &RerouteCommand) -> Result<()>;
}

#[async_trait::async_trait]
impl ClusterApi for ClusterClient {
    #[instrument(skip(self))]
    async fn list_nodes(&self) -> Result<Vec<NodeRecord>> {
        self.cat_nodes()
            .await
            .map_err(|e| RebalanceError::fetch("listing nodes", e))
    }

    #[instrument(skip(self))]
    async fn list_shards(&self) -> Result<Vec<ShardRecord>> {
        self.cat_shards()
            .await
            .map_err(|e| RebalanceError::fetch("listing shards", e))
    }

    #[instrument(skip(self), fields(index = command.index(), shard = command.shard(), node = command.node()))]
    async fn submit_reroute(&self, command: &RerouteCommand) -> Result<()> {
        self.reroute(command).await.map_err(|e| match e {
            ClientError::NotAcknowledged => RebalanceError::NotAcknowledged {
                index: command.index().to_string(),
                shard: command.shard(),
                node: command.node().to_string(),
            },
            other => other.into(),
        })
    }
}
