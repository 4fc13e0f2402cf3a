//! Error types for the retrofit scheduler.

use crate::types::{TaskId, TileCoord, WorldId};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("Failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Errors surfaced by the retrofit core.
#[derive(Debug, Error)]
pub enum RetrogenError {
    /// The step-local generation target could not be resolved from the
    /// world's provider. Fatal for that step's drain.
    #[error("No generation target available for {world}")]
    MissingGenerationTarget { world: WorldId },

    /// A retrofit task failed while executing. Completion was not recorded,
    /// so the task stays owed; the failure surfaces to the host's
    /// step-failure handling.
    #[error("Retrofit task {task} failed for tile {tile}: {source}")]
    TaskFailed {
        task: TaskId,
        tile: TileCoord,
        #[source]
        source: anyhow::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
