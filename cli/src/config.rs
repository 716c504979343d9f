//! Node configuration
//!
//! TOML-backed configuration with per-network presets.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Full node configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MotionConfig {
    /// General node settings
    #[serde(default)]
    pub node: NodeSettings,

    /// Participation-round settings
    #[serde(default)]
    pub consensus: ConsensusSettings,

    /// Dictionary registry settings
    #[serde(default)]
    pub registry: RegistrySettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl MotionConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Create configuration for a named network
    pub fn for_network(network: &str) -> Self {
        match network {
            "mainnet" => Self::mainnet(),
            "testnet" => Self::testnet(),
            _ => Self::local(),
        }
    }

    /// Local development configuration: tiny quorum, fast blocks
    pub fn local() -> Self {
        Self {
            node: NodeSettings {
                network: "local".to_string(),
                block_interval_ms: 200,
                ..Default::default()
            },
            consensus: ConsensusSettings {
                quorum_size: 3,
                probe_interval_ms: 10,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Testnet configuration
    pub fn testnet() -> Self {
        Self {
            node: NodeSettings {
                network: "testnet".to_string(),
                block_interval_ms: 10_000,
                ..Default::default()
            },
            consensus: ConsensusSettings {
                quorum_size: 5,
                probe_interval_ms: 10_000,
                ..Default::default()
            },
            registry: RegistrySettings {
                min_fuel: 1_000,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Mainnet configuration: one-minute blocks, one probe per minute
    pub fn mainnet() -> Self {
        Self {
            node: NodeSettings {
                network: "mainnet".to_string(),
                block_interval_ms: 60_000,
                ..Default::default()
            },
            consensus: ConsensusSettings {
                quorum_size: 21,
                probe_interval_ms: 60_000,
                ..Default::default()
            },
            registry: RegistrySettings {
                min_fuel: 10_000,
                min_coinbase: 10,
            },
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.consensus.quorum_size == 0 {
            return Err(ConfigError::Invalid(
                "quorum_size must be greater than 0".to_string(),
            ));
        }
        if self.consensus.registration_window >= motion_registry::ROUND_LENGTH {
            return Err(ConfigError::Invalid(
                "registration_window must fit inside the round".to_string(),
            ));
        }
        Ok(())
    }

    /// Round configuration derived from the consensus settings
    pub fn round_config(&self) -> motion_round::RoundConfig {
        motion_round::RoundConfig::default()
            .with_quorum_size(self.consensus.quorum_size)
            .with_registration_window(self.consensus.registration_window)
            .with_probe_interval(std::time::Duration::from_millis(
                self.consensus.probe_interval_ms,
            ))
    }

    /// Registry configuration derived from the registry settings
    pub fn registry_config(&self) -> motion_registry::RegistryConfig {
        motion_registry::RegistryConfig {
            min_fuel: self.registry.min_fuel,
            min_coinbase: self.registry.min_coinbase,
        }
    }
}

/// General node settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSettings {
    /// Network name (local, testnet, mainnet)
    pub network: String,

    /// Node name for identification
    pub name: Option<String>,

    /// Block clock interval in milliseconds
    pub block_interval_ms: u64,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            network: "local".to_string(),
            name: None,
            block_interval_ms: 60_000,
        }
    }
}

/// Participation-round settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusSettings {
    /// Quorum members per round
    pub quorum_size: usize,

    /// Blocks after round open during which registration is accepted
    pub registration_window: u64,

    /// Probe cadence in milliseconds
    pub probe_interval_ms: u64,
}

impl Default for ConsensusSettings {
    fn default() -> Self {
        Self {
            quorum_size: 5,
            registration_window: 1,
            probe_interval_ms: 60_000,
        }
    }
}

/// Dictionary registry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Minimum fuel accepted at publication
    pub min_fuel: u64,

    /// Dormancy floor: smallest coinbase an entry must still fund
    pub min_coinbase: u64,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            min_fuel: 100,
            min_coinbase: 1,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,

    /// Output format (text, json)
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Default data directory for a network
pub fn default_data_dir(network: &str) -> PathBuf {
    let base = directories::ProjectDirs::from("network", "motion", "motion")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".motion"));

    base.join(network)
}

/// Default config file path inside a data directory
pub fn default_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = MotionConfig::default();
        assert_eq!(config.node.network, "local");
        assert_eq!(config.consensus.quorum_size, 5);
    }

    #[test]
    fn test_local_preset() {
        let config = MotionConfig::local();
        assert_eq!(config.consensus.quorum_size, 3);
        assert!(config.node.block_interval_ms < 1000);
    }

    #[test]
    fn test_mainnet_preset() {
        let config = MotionConfig::mainnet();
        assert_eq!(config.node.block_interval_ms, 60_000);
        assert_eq!(config.consensus.probe_interval_ms, 60_000);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = MotionConfig::local();
        config.save(&path).unwrap();

        let loaded = MotionConfig::load(&path).unwrap();
        assert_eq!(loaded.node.network, "local");
        assert_eq!(loaded.consensus.quorum_size, 3);
    }

    #[test]
    fn test_zero_quorum_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = MotionConfig::local();
        config.consensus.quorum_size = 0;
        config.save(&path).unwrap();

        assert!(MotionConfig::load(&path).is_err());
    }
}
