//! Configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Every section is optional in the TOML file and falls back to defaults.
//!
//! # Example
//!
//! ```no_run
//! use pagesync::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("pagesync.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use super::logging::{LoggingConfig, LOG_FORMATS};
use super::sync::{SyncConfig, MAX_NOTIFICATION_CAPACITY};
use crate::error::{ConfigError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub sync: SyncConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Initialize logging from the `[logging]` section.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "level" }.into());
        }
        if let Err(e) = EnvFilter::try_new(&self.logging.level) {
            return Err(ConfigError::InvalidValue {
                field: "level",
                reason: e.to_string(),
            }
            .into());
        }
        if !LOG_FORMATS.iter().any(|f| *f == self.logging.format) {
            return Err(ConfigError::InvalidValue {
                field: "format",
                reason: format!("expected one of {LOG_FORMATS:?}"),
            }
            .into());
        }
        if self.sync.notification_capacity > MAX_NOTIFICATION_CAPACITY {
            return Err(ConfigError::InvalidValue {
                field: "notification_capacity",
                reason: format!("must be at most {MAX_NOTIFICATION_CAPACITY}"),
            }
            .into());
        }
        Ok(())
    }
}
