//! Cluster Client
//!
//! HTTP client for the cluster's `_cat` listings and `_cluster/reroute`.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::types::{NodeRecord, RerouteCommand, RerouteRequest, RerouteResponse, ShardRecord};

/// Endpoint used when none is configured
pub const DEFAULT_ENDPOINT: &str = "localhost:9200";

/// Connect and request timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const CAT_NODES_PATH: &str = "/_cat/nodes?h=ip,node.role,name&format=json";
const CAT_SHARDS_PATH: &str =
    "/_cat/shards?h=index,shard,prirep,state,docs,node,store,ip,unassigned.reason&format=json";
const REROUTE_PATH: &str = "/_cluster/reroute";

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cluster responded with HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request was not acknowledged")]
    NotAcknowledged,
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Cluster client
#[derive(Debug, Clone)]
pub struct ClusterClient {
    client: Client,
    base_url: String,
}

impl ClusterClient {
    /// Create a client for `endpoint` with the same bound for connecting and
    /// for the whole request.
    ///
    /// `endpoint` may be a bare `host:port`, in which case plain HTTP is used.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self::with_client(endpoint, client))
    }

    /// Wrap an already configured reqwest client
    pub fn with_client(endpoint: &str, client: Client) -> Self {
        Self {
            client,
            base_url: normalize_endpoint(endpoint),
        }
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List cluster nodes
    pub async fn cat_nodes(&self) -> Result<Vec<NodeRecord>> {
        self.get_json(CAT_NODES_PATH).await
    }

    /// List shard allocations
    pub async fn cat_shards(&self) -> Result<Vec<ShardRecord>> {
        self.get_json(CAT_SHARDS_PATH).await
    }

    /// Submit a single reroute command
    pub async fn reroute(&self, command: &RerouteCommand) -> Result<()> {
        let url = format!("{}{}", self.base_url, REROUTE_PATH);
        let commands = std::slice::from_ref(command);

        debug!(url = %url, command = ?command, "Submitting reroute");

        let response = self
            .client
            .post(&url)
            .json(&RerouteRequest { commands })
            .send()
            .await?;

        let body: RerouteResponse = Self::decode(response).await?;
        if !body.acknowledged {
            return Err(ClientError::NotAcknowledged);
        }

        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Fetching");

        let response = self.client.get(&url).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_endpoint_gets_http_scheme() {
        assert_eq!(normalize_endpoint("localhost:9200"), "http://localhost:9200");
    }

    #[test]
    fn test_url_endpoint_kept() {
        assert_eq!(
            normalize_endpoint("https://search.internal:9243/"),
            "https://search.internal:9243"
        );
    }

    #[test]
    fn test_client_base_url() {
        let client = ClusterClient::new(DEFAULT_ENDPOINT, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9200");
    }
}
