//! Structured logging built on the `tracing` crate.
//!
//! Hosts that already install their own subscriber can skip [`init_logging`]
//! entirely; the scheduler only emits through the `tracing` macros.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
        }
    }
}

/// Initialize the logging system.
///
/// Priority order (highest to lowest):
/// 1. `RETROGEN_LOG` environment variable
/// 2. Configuration file
/// 3. Defaults
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ConfigError> {
    let level = config.map(|c| c.level.as_str()).unwrap_or("info");
    let filter = EnvFilter::try_from_env("RETROGEN_LOG")
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| ConfigError::Invalid {
            key: "logging.level".to_string(),
            message: e.to_string(),
        })?;

    let base = Registry::default().with(filter);
    let result = match config.map(|c| c.format.as_str()).unwrap_or("text") {
        "json" => base.with(fmt::layer().json()).try_init(),
        "text" => base.with(fmt::layer()).try_init(),
        other => {
            return Err(ConfigError::Invalid {
                key: "logging.format".to_string(),
                message: format!("unknown format '{other}'"),
            })
        }
    };

    result.map_err(|e| ConfigError::Invalid {
        key: "logging".to_string(),
        message: e.to_string(),
    })
}
