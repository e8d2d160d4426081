// src/errors.rs

//! Crate-wide error taxonomy.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipewatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A rule or the pipeline references a job name with no registered
    /// descriptor. Detected at startup, before any watching begins.
    #[error("Scheduling error: {0}")]
    SchedulingError(String),

    /// A one-shot or spawn job failed its pass. Fatal in once mode only.
    #[error("Job '{job}' failed its pass")]
    PassFailed { job: String },

    /// A persist-lifecycle process exited unexpectedly. Fatal to the whole
    /// watch session; no auto-restart.
    #[error("Long-lived process for job '{job}' exited unexpectedly")]
    PersistCrash { job: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipewatchError>;
