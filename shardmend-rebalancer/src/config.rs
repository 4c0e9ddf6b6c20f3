//! Rebalancer configuration
//!
//! Configuration loaded from environment variables and command line.

use shardmend_client::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::snapshot::TopologyPolicy;
use crate::RebalanceOptions;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Rebalancer configuration
#[derive(Debug, Clone)]
pub struct RebalancerConfig {
    /// Cluster endpoint, `host:port` or a full URL
    pub endpoint: String,

    /// Connect and request timeout in seconds
    pub timeout_secs: u64,

    /// Plan and log placements without submitting reroutes
    pub dry_run: bool,

    /// Fail the run when a shard is hosted on a node missing from the node listing
    pub strict_topology: bool,
}

impl Default for RebalancerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            dry_run: false,
            strict_topology: false,
        }
    }
}

impl RebalancerConfig {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let endpoint = std::env::var("SHARDMEND_ENDPOINT").unwrap_or(defaults.endpoint);

        let timeout_secs = env_parse("SHARDMEND_TIMEOUT_SECS")?.unwrap_or(defaults.timeout_secs);

        let dry_run = env_flag("SHARDMEND_DRY_RUN")?.unwrap_or(defaults.dry_run);

        let strict_topology =
            env_flag("SHARDMEND_STRICT_TOPOLOGY")?.unwrap_or(defaults.strict_topology);

        let config = Self {
            endpoint,
            timeout_secs,
            dry_run,
            strict_topology,
        };
        config.validate()?;

        Ok(config)
    }

    /// Check values that would make every request fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "timeout_secs".to_string(),
                "must be at least 1 second".to_string(),
            ));
        }
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "endpoint".to_string(),
                "must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn topology_policy(&self) -> TopologyPolicy {
        if self.strict_topology {
            TopologyPolicy::Strict
        } else {
            TopologyPolicy::Warn
        }
    }

    /// Options for a single rebalancing run
    pub fn options(&self) -> RebalanceOptions {
        RebalanceOptions {
            policy: self.topology_policy(),
            dry_run: self.dry_run,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), value)),
        Err(_) => Ok(None),
    }
}

fn env_flag(key: &str) -> Result<Option<bool>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => parse_flag(&value)
            .map(Some)
            .ok_or_else(|| ConfigError::InvalidValue(key.to_string(), value)),
        Err(_) => Ok(None),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}
