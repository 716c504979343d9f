//! Init command: write a default configuration

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::info;

use crate::config::{default_config_path, default_data_dir, MotionConfig};

/// Initialize a node configuration
#[derive(Args)]
pub struct InitCommand {
    /// Network preset to initialize (local, testnet, mainnet)
    #[arg(short, long, default_value = "local")]
    network: String,

    /// Overwrite an existing configuration
    #[arg(long)]
    force: bool,
}

impl InitCommand {
    pub async fn execute(self, data_dir: Option<PathBuf>) -> anyhow::Result<()> {
        let data_dir = data_dir.unwrap_or_else(|| default_data_dir(&self.network));
        let config_path = default_config_path(&data_dir);

        if config_path.exists() && !self.force {
            anyhow::bail!(
                "config already exists at {} (use --force to overwrite)",
                config_path.display()
            );
        }

        let config = MotionConfig::for_network(&self.network);
        config
            .save(&config_path)
            .with_context(|| format!("writing {}", config_path.display()))?;

        info!(network = %self.network, path = %config_path.display(), "configuration written");
        println!("Initialized {} configuration at {}", self.network, config_path.display());
        Ok(())
    }
}
