use super::agent::RawAgent;
use super::error::ConfigError;
use super::provider::RawProvider;
use super::runtime::RawRuntime;
use super::server::RawServer;
use super::{AppConfig, CONFIG_PATH};
use crate::constants::ENV_FILE;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Raw configuration structure for deserialization from TOML
#[derive(Debug, Deserialize, Default)]
pub(super) struct RawConfig {
    pub prompt: Option<String>,
    #[serde(default)]
    pub agent: RawAgent,
    #[serde(default)]
    pub server: RawServer,
    #[serde(default)]
    pub provider: RawProvider,
    #[serde(default)]
    pub runtime: RawRuntime,
}

/// Load environment variables from an env file.
///
/// With no path, `.env` is searched for from the working directory upward and
/// its absence is not an error. An explicit path must exist. Variables that
/// are already set in the process environment are left untouched.
pub fn load_env(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    match path {
        Some(path) => match dotenvy::from_path(path) {
            Ok(()) => {
                info!(path = %path.display(), "Loaded environment file");
                Ok(Some(path.to_path_buf()))
            }
            Err(err) if err.not_found() => Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            }),
            Err(source) => Err(ConfigError::Env {
                path: Some(path.to_path_buf()),
                source,
            }),
        },
        None => match dotenvy::from_filename(ENV_FILE) {
            Ok(found) => {
                info!(path = %found.display(), "Loaded environment file");
                Ok(Some(found))
            }
            Err(err) if err.not_found() => {
                debug!("No environment file found; using process environment only");
                Ok(None)
            }
            Err(source) => Err(ConfigError::Env { path: None, source }),
        },
    }
}

/// Load and validate configuration from a file path
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => read_config(path),
        None => {
            let default_path = Path::new(CONFIG_PATH);
            if default_path.exists() {
                read_config(default_path)
            } else {
                debug!(path = CONFIG_PATH, "No configuration file; using defaults");
                Ok(AppConfig::default())
            }
        }
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    debug!(path = %path.display(), "Reading configuration file");

    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_config(&content, path)
}

pub(super) fn parse_config(content: &str, path: &Path) -> Result<AppConfig, ConfigError> {
    let parsed: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_and_build(parsed)
}

fn validate_and_build(parsed: RawConfig) -> Result<AppConfig, ConfigError> {
    let defaults = AppConfig::default();
    let config = AppConfig {
        agent: parsed.agent.into(),
        prompt: parsed.prompt.unwrap_or(defaults.prompt),
        server: parsed.server.into(),
        provider: parsed.provider.into(),
        runtime: parsed.runtime.into(),
    };

    require_non_empty("agent.name", &config.agent.name)?;
    require_non_empty("agent.model", &config.agent.model)?;
    require_non_empty("prompt", &config.prompt)?;
    require_non_empty("server.name", &config.server.name)?;
    require_non_empty("server.command", &config.server.command.to_string_lossy())?;
    require_non_empty("provider.endpoint", &config.provider.endpoint)?;

    if config.runtime.max_turns == 0 {
        return Err(ConfigError::InvalidValue {
            field: "runtime.max_turns",
            reason: "must be at least 1".to_string(),
        });
    }
    if config.runtime.handshake_timeout.is_zero() {
        return Err(ConfigError::InvalidValue {
            field: "runtime.handshake_timeout_secs",
            reason: "must be greater than zero".to_string(),
        });
    }
    if config.runtime.ready_timeout.is_zero() {
        return Err(ConfigError::InvalidValue {
            field: "runtime.ready_timeout_secs",
            reason: "must be greater than zero".to_string(),
        });
    }
    if config.runtime.ready_poll_interval.is_zero() {
        return Err(ConfigError::InvalidValue {
            field: "runtime.ready_poll_interval_ms",
            reason: "must be greater than zero".to_string(),
        });
    }

    Ok(config)
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::EmptyField { field })
    } else {
        Ok(())
    }
}
