//! Per-client configuration. Each [`EthClient`](crate::EthClient) carries its own,
//! so clients for different networks can be used side by side.

use crate::DEFAULT_POLL_INTERVAL;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::time::Duration;
use url::Url;

const MAINNET_URL: &str = "https://mainnet.infura.io";
const RINKEBY_URL: &str = "https://rinkeby.infura.io";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Rinkeby,
    Custom { url: Url, chain_id: u64 },
}

impl Network {
    /// JSON-RPC endpoint of the network.
    pub fn url(&self) -> &str {
        match self {
            Network::Mainnet => MAINNET_URL,
            Network::Rinkeby => RINKEBY_URL,
            Network::Custom { url, .. } => url.as_str(),
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 1,
            Network::Rinkeby => 4,
            Network::Custom { chain_id, .. } => *chain_id,
        }
    }
}

/// How transaction trackers poll for receipts. Durations are in seconds.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,
    /// Give up on transactions that are not mined within this time. Trackers
    /// poll until cancelled if unset.
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    #[serde(default)]
    pub timeout: Option<Duration>,
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

impl ClientConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid client config")
    }
}
