use crate::error::ConfigError;
use crate::protocol::{HEARTBEAT_INTERVAL_MS, HEARTBEAT_TICK_MS};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

/// Broker startup configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bind address for the exclusive producer channel.
    #[serde(default = "default_producer_address")]
    pub producer_address: String,
    /// Bind address for the multiplexed worker channel.
    #[serde(default = "default_worker_address")]
    pub worker_address: String,
    /// Minimum spacing between heartbeats to an idle worker, in milliseconds.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Event-loop wake cadence, in milliseconds. Upper bound on heartbeat
    /// latency.
    #[serde(default = "default_heartbeat_tick_ms")]
    pub heartbeat_tick_ms: u64,
}

fn default_producer_address() -> String {
    "127.0.0.1:9555".to_owned()
}

fn default_worker_address() -> String {
    "127.0.0.1:9556".to_owned()
}

fn default_heartbeat_interval_ms() -> u64 {
    HEARTBEAT_INTERVAL_MS
}

fn default_heartbeat_tick_ms() -> u64 {
    HEARTBEAT_TICK_MS
}

impl Default for Config {
    fn default() -> Self {
        Config {
            producer_address: default_producer_address(),
            worker_address: default_worker_address(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_tick_ms: default_heartbeat_tick_ms(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn heartbeat_tick(&self) -> Duration {
        Duration::from_millis(self.heartbeat_tick_ms)
    }
}
