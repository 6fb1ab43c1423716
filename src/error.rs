use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the benchmark driver.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value needed for the requested operation was never set.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A wait was interrupted by the shutdown signal before it elapsed.
    #[error("wait cancelled by shutdown signal")]
    Cancelled,

    #[error("could not load sql files from {}", path.display())]
    QueryLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("graphite request failed: {0}")]
    Graphite(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A reporter could not deliver its report.
    #[error("report error: {0}")]
    Report(String),
}

impl Error {
    pub fn invalid_configuration<T: Into<String>>(msg: T) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn report<T: Into<String>>(msg: T) -> Self {
        Self::Report(msg.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
