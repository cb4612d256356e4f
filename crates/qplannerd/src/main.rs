//! Reference planner daemon.
//!
//! Serves the planning heuristic so a bridge can be exercised without a
//! full planning engine.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

#[derive(Parser)]
#[command(name = "qplannerd")]
#[command(about = "Reference QKD cycle planner service", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the planner RPC surface until interrupted
    Serve {
        /// Listen address for the HTTP server
        #[arg(long, default_value = "127.0.0.1:7700")]
        listen: String,

        /// Enable debug logging output
        #[arg(long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { listen, verbose } => {
            tracing_subscriber::fmt()
                .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
                .init();

            qplannerd::server::run(&listen).await
        }
    }
}
