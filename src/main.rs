//! ralley - local HTTP job queue.
//!
//! Main entry point for the ralley CLI.

mod cli;
mod server;

use clap::Parser;

use ralley_config::{ralley_dir, ConfigLoader};

use crate::cli::{Cli, Commands, DevArgs};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .unwrap_or_else(|| ralley_dir().join("config.toml"));
    let mut config = ConfigLoader::load_or_default(&config_path)?;

    match cli.command.unwrap_or(Commands::Dev(DevArgs::default())) {
        Commands::Dev(args) => {
            args.apply(&mut config);
            server::init_tracing(&config)?;
            tracing::debug!(path = %config_path.display(), "Configuration loaded");
            server::run_dev(config).await
        }
    }
}
