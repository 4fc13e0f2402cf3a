//! Configuration for the retrofit scheduler.
//!
//! A single TOML file with one tunable, the per-step execution throttle, plus
//! the logging section. A missing file is created with defaults so hosts
//! always end up with an editable config on disk; an existing file is
//! rewritten only when its stored values differ from the resolved ones.

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MAX_PER_TICK: u32 = 100;

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrogenConfig {
    /// Maximum number of retrofit tasks executed in a single simulation step.
    #[serde(default = "default_max_per_tick")]
    pub max_per_tick: u32,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_max_per_tick() -> u32 {
    DEFAULT_MAX_PER_TICK
}

impl Default for RetrogenConfig {
    fn default() -> Self {
        Self {
            max_per_tick: default_max_per_tick(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RetrogenConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_per_tick == 0 {
            return Err(ConfigError::Invalid {
                key: "max_per_tick".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Load the configuration from `path`, creating the file with defaults
    /// when it does not exist.
    ///
    /// The file is written back only when its parsed contents do not already
    /// match the resolved configuration, so hand-edited files keep their
    /// comments unless a key was missing.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        let existing = match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let loaded = if existing.is_some() {
            let cfg = config::Config::builder()
                .add_source(config::File::from(path.to_path_buf()))
                .build()?;
            cfg.try_deserialize::<RetrogenConfig>()?
        } else {
            RetrogenConfig::default()
        };
        loaded.validate()?;

        let resolved = toml::Value::try_from(&loaded)?;
        let stored = existing
            .as_deref()
            .and_then(|text| toml::from_str::<toml::Value>(text).ok());
        if stored.as_ref() != Some(&resolved) {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            }
            let rendered = toml::to_string_pretty(&loaded)?;
            std::fs::write(path, rendered).map_err(|e| ConfigError::Write {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        Ok(loaded)
    }
}
