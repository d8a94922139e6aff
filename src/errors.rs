// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::task::TaskId;

#[derive(Error, Debug)]
pub enum EncarunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A second `start` while the controller slot is still occupied.
    #[error("task {0} is still active; wait for its result or cancel it first")]
    TaskAlreadyRunning(TaskId),

    #[error("task controller is no longer running")]
    ControllerClosed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EncarunError>;
