//! Rebalancer errors

use shardmend_client::ClientError;
use thiserror::Error;

/// Errors that stop a rebalancing run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RebalanceError {
    /// Listing or reroute call failed, or a listing held malformed data
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Reroute of {index}/{shard} to {node} was not acknowledged")]
    NotAcknowledged {
        index: String,
        shard: u32,
        node: String,
    },

    #[error("No eligible data nodes to place shards on")]
    NoEligibleNodes,

    #[error("Shard {index}/{shard} is hosted on unknown node {node}")]
    InconsistentTopology {
        index: String,
        shard: u32,
        node: String,
    },
}

pub type Result<T> = std::result::Result<T, RebalanceError>;

impl RebalanceError {
    pub(crate) fn fetch(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Fetch(format!("{}: {}", context, err))
    }
}

impl From<ClientError> for RebalanceError {
    fn from(err: ClientError) -> Self {
        Self::Fetch(err.to_string())
    }
}
