//! Queue configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Keep completed jobs in the store instead of deleting them.
    #[serde(default)]
    pub retain: bool,

    /// Upper bound on the scheduler's sleep between passes, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Snapshot file. `None` keeps the queue in memory only.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    /// Workspace stamped on registered jobs.
    #[serde(default = "default_workspace")]
    pub workspace: String,
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_workspace() -> String {
    "dev".to_string()
}

impl QueueConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            retain: false,
            tick_interval_ms: default_tick_interval_ms(),
            snapshot_path: None,
            workspace: default_workspace(),
        }
    }
}

/// Outbound HTTP limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum duration of a single call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum response body size, in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: u64,
}

fn default_timeout_secs() -> u64 {
    24 * 60 * 60
}

fn default_max_response_bytes() -> u64 {
    15 * 1_000_000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}
