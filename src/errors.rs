// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// An output folder could not be created. Fatal for the task that needed it.
    #[error("could not create folder {path:?}: {source}")]
    FolderCreation {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Task not found: {0}")]
    UnknownTask(String),

    #[error("Invalid task graph: {0}")]
    InvalidGraph(String),

    #[error("Cycle detected in task graph: {0}")]
    TaskCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
