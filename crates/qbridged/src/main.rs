//! QKD bridge daemon.
//!
//! Connects a transceiver controller to a planner service and runs the
//! closed control loop until interrupted.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

use qbridged::config::{resolve_config_path, BridgeConfig, DEFAULT_CONFIG_PATH};
use qbridged::runtime::BridgeRuntime;

#[derive(Parser)]
#[command(name = "qbridged")]
#[command(about = "QKD transceiver bridge daemon", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the closed-loop bridge until interrupted
    Run {
        /// Path to the bridge YAML configuration
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Enable debug logging output
        #[arg(long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, verbose } => run(config, verbose).await,
    }
}

async fn run(config: PathBuf, verbose: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let path = resolve_config_path(&config)?;
    let config = BridgeConfig::load(&path)?;

    let mut runtime = BridgeRuntime::new(config);
    runtime.connect()?;
    runtime.run().await?;
    Ok(())
}
