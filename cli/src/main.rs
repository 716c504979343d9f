//! MOTION node CLI
//!
//! # Usage
//!
//! ```bash
//! # Initialize a local configuration
//! motion init --network local
//!
//! # Run a local simulation for five rounds
//! motion run --rounds 5
//!
//! # Run against a saved configuration
//! motion run --config ~/.motion/local/config.toml
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod logging;

use commands::{InitCommand, RunCommand};

/// MOTION network node
#[derive(Parser)]
#[command(name = "motion")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Side-protocol dictionary with participation-round consensus", long_about = None)]
struct Cli {
    /// Data directory
    #[arg(short, long, global = true, env = "MOTION_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a node configuration
    Init(InitCommand),

    /// Run a local simulation node
    Run(RunCommand),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level, cli.json_logs)?;

    match cli.command {
        Commands::Init(cmd) => cmd.execute(cli.data_dir).await,
        Commands::Run(cmd) => cmd.execute().await,
        Commands::Version => {
            println!("motion {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
