//! Engine configuration.
//!
//! Capabilities that older engines toggled by library version are plain
//! fields here. A process-wide snapshot is resolved once, on first use of
//! [`EngineConfig::global`], and never re-read.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Environment variable naming a JSON file with an [`EngineConfig`].
pub const CONFIG_ENV_VAR: &str = "FRAGKIT_CONFIG";

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Engine-wide parser and serializer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Serialize void elements as `<br />` in XHTML mode (otherwise `<br>`).
    pub xhtml_self_closing_void: bool,

    /// Encoding assumed when sniffing finds nothing and the input is not UTF-8.
    pub fallback_encoding: String,

    /// Maximum depth of open elements before parsing stops.
    pub max_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            xhtml_self_closing_void: true,
            fallback_encoding: "windows-1252".to_string(),
            max_depth: 256,
        }
    }
}

lazy_static! {
    static ref GLOBAL: EngineConfig = EngineConfig::from_env();
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load from the file named by `FRAGKIT_CONFIG`, falling back to defaults.
    pub fn from_env() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV_VAR) else {
            return Self::default();
        };

        match Self::from_file(Path::new(&path)) {
            Ok(config) => {
                debug!(?path, ?config, "Loaded engine config");
                config
            }
            Err(e) => {
                warn!(?path, error = %e, "Ignoring unreadable engine config");
                Self::default()
            }
        }
    }

    /// The process-wide configuration snapshot.
    pub fn global() -> &'static EngineConfig {
        &GLOBAL
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be positive".into()));
        }
        if self.fallback_encoding.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "fallback_encoding must not be empty".into(),
            ));
        }
        Ok(())
    }
}
