use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found at {path:?}")]
    NotFound { path: PathBuf },

    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to load environment file: {source}")]
    Env {
        path: Option<PathBuf>,
        #[source]
        source: dotenvy::Error,
    },

    #[error("configuration field '{field}' must not be empty")]
    EmptyField { field: &'static str },

    #[error("configuration field '{field}' is invalid: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
