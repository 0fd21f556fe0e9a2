//! Emulator Configuration
//!
//! Handles loading and saving emulator configuration from TOML files.

use std::fs;
use std::path::{Path, PathBuf};

use avm_emu_arc4::ResourceEncoding;
use avm_emu_ledger::LedgerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

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

/// Full emulator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmulatorConfig {
    /// Ledger seed values
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Resource reference settings
    #[serde(default)]
    pub resources: ResourceSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl EmulatorConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        info!(path = %path.display(), "Loaded emulator configuration");
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

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.initial_app_id == 0 {
            return Err(ConfigError::Invalid(
                "initial_app_id must be greater than 0".to_string(),
            ));
        }

        if self.ledger.initial_asset_id == 0 {
            return Err(ConfigError::Invalid(
                "initial_asset_id must be greater than 0".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(ConfigError::Invalid(format!(
                "Unknown log format '{}', expected text or json",
                self.logging.format
            )));
        }

        Ok(())
    }
}

/// Resource reference settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSettings {
    /// How account/asset/application arguments are encoded
    #[serde(default)]
    pub encoding: ResourceEncoding,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
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
