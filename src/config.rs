//! Configuration types for hnreplies

use crate::endpoints::Endpoints;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};

/// Remote item API settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the item API (default: "https://hacker-news.firebaseio.com/v0/")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for a single transfer (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_as::secs")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Transport multiplexer and blocking fetch settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum number of transfers in flight at once (default: 64)
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Poll attempts when waiting for a specific item (default: 10)
    #[serde(default = "default_item_retries")]
    pub item_retries: u32,

    /// Sleep between poll attempts (default: 1000 ms)
    #[serde(default = "default_item_retry_delay", with = "duration_as::millis")]
    pub item_retry_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            item_retries: default_item_retries(),
            item_retry_delay: default_item_retry_delay(),
        }
    }
}

/// Change-detection timing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Sleep between checks while waiting for the updates list (default: 1 second)
    #[serde(default = "default_poll_interval", with = "duration_as::millis")]
    pub poll_interval: Duration,

    /// Sleep after an unchanged updates list (default: 5 seconds)
    #[serde(default = "default_idle_interval", with = "duration_as::millis")]
    pub idle_interval: Duration,

    /// Rounds slower than this are reported as a warning (default: 30 seconds)
    #[serde(default = "default_slow_round_threshold", with = "duration_as::secs")]
    pub slow_round_threshold: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            idle_interval: default_idle_interval(),
            slow_round_threshold: default_slow_round_threshold(),
        }
    }
}

/// Reply store location
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory holding one subdirectory per recipient (default: "./data")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Read-side query server
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Serve the query endpoint alongside the ingester (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Maximum replies returned per query (default: 100)
    #[serde(default = "default_max_replies")]
    pub max_replies: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: default_bind_address(),
            max_replies: default_max_replies(),
        }
    }
}

/// Main configuration for the reply ingester
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Concurrency and retry budget
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Polling cadence
    #[serde(default)]
    pub poll: PollConfig,

    /// Reply store
    #[serde(default)]
    pub store: StoreConfig,

    /// Query server
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load a configuration from a JSON file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings that would make the ingester unusable
    pub fn validate(&self) -> Result<()> {
        if self.fetch.max_parallel == 0 {
            return Err(Error::config(
                "fetch.max_parallel",
                "max_parallel must be at least 1",
            ));
        }

        Endpoints::new(&self.api.base_url)?;

        Ok(())
    }
}

fn default_base_url() -> String {
    "https://hacker-news.firebaseio.com/v0/".to_string()
}

fn default_user_agent() -> String {
    concat!("hnreplies/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_parallel() -> usize {
    64
}

fn default_item_retries() -> u32 {
    10
}

fn default_item_retry_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_idle_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_slow_round_threshold() -> Duration {
    Duration::from_secs(30)
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_max_replies() -> usize {
    100
}

/// Durations are written as plain integers in the config file; the unit
/// is part of the field's contract rather than the value.
mod duration_as {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Whole seconds
    pub mod secs {
        use super::*;

        pub fn serialize<S: Serializer>(value: &Duration, out: S) -> Result<S::Ok, S::Error> {
            out.serialize_u64(value.as_secs())
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(input: D) -> Result<Duration, D::Error> {
            u64::deserialize(input).map(Duration::from_secs)
        }
    }

    /// Milliseconds
    pub mod millis {
        use super::*;

        pub fn serialize<S: Serializer>(value: &Duration, out: S) -> Result<S::Ok, S::Error> {
            out.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(input: D) -> Result<Duration, D::Error> {
            u64::deserialize(input).map(Duration::from_millis)
        }
    }
}
