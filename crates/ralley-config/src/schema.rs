//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub queue: QueueSection,

    #[serde(default)]
    pub dispatch: DispatchSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4747
}

/// Queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSection {
    /// Keep completed jobs in the snapshot instead of deleting them.
    #[serde(default)]
    pub retain: bool,

    /// Upper bound on how long the scheduler sleeps between passes.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Snapshot file. Defaults to `~/.ralley/dev.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,

    /// Workspace stamped on every registered job.
    #[serde(default = "default_workspace")]
    pub workspace: String,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            retain: false,
            tick_interval_ms: default_tick_interval_ms(),
            snapshot_path: None,
            workspace: default_workspace(),
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_workspace() -> String {
    "dev".to_string()
}

/// Outbound dispatch limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSection {
    #[serde(default = "default_dispatch_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: u64,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            timeout_seconds: default_dispatch_timeout(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

fn default_dispatch_timeout() -> u64 {
    24 * 60 * 60
}

fn default_max_response_bytes() -> u64 {
    15 * 1_000_000
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Write a daily-rolling log file next to the console output.
    #[serde(default = "default_file_logging")]
    pub file: bool,

    /// Log directory. Defaults to `~/.ralley/logs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_file_logging(),
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_file_logging() -> bool {
    true
}

/// The `~/.ralley` directory.
pub fn ralley_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".ralley"))
        .unwrap_or_else(|| PathBuf::from(".ralley"))
}

impl Config {
    /// Snapshot path, falling back to `~/.ralley/dev.json`.
    pub fn snapshot_path(&self) -> PathBuf {
        self.queue
            .snapshot_path
            .clone()
            .unwrap_or_else(|| ralley_dir().join("dev.json"))
    }

    /// Log directory, falling back to `~/.ralley/logs`.
    pub fn log_dir(&self) -> PathBuf {
        self.logging
            .dir
            .clone()
            .unwrap_or_else(|| ralley_dir().join("logs"))
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
