//! CLI definitions for ralley.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ralley_config::Config;

/// ralley CLI.
#[derive(Parser)]
#[command(name = "ralley")]
#[command(about = "Local job queue with delayed, retried and recurring HTTP delivery")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to ~/.ralley/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the local dev queue (default)
    Dev(DevArgs),
}

/// Options of `ralley dev`. Each one overrides the configuration file.
#[derive(Args, Debug, Default)]
pub(crate) struct DevArgs {
    /// Listen host
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Keep completed jobs instead of deleting them
    #[arg(short, long)]
    pub retain: bool,

    /// Snapshot file (defaults to ~/.ralley/dev.json)
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Workspace stamped on registered jobs
    #[arg(short, long)]
    pub workspace: Option<String>,
}

impl DevArgs {
    pub fn apply(self, config: &mut Config) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.retain {
            config.queue.retain = true;
        }
        if let Some(snapshot) = self.snapshot {
            config.queue.snapshot_path = Some(snapshot);
        }
        if let Some(workspace) = self.workspace {
            config.queue.workspace = workspace;
        }
    }
}
