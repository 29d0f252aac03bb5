//! # Provider Configuration
//!
//! Connection settings for the OpenAI-compatible chat-completions service.
//! The API key itself never lives in the config file; only the name of the
//! environment variable that holds it does.
//!
//! ```toml
//! [provider]
//! endpoint = "https://api.openai.com"
//! api_path = "/v1/chat/completions"
//! api_key_env = "OPENAI_API_KEY"
//! ```

use crate::constants::{DEFAULT_API_KEY_ENV, DEFAULT_API_PATH, DEFAULT_ENDPOINT};
use serde::Deserialize;
use std::env;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Identifier used in logs and error messages
    pub id: String,
    pub endpoint: String,
    pub api_path: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            id: "openai".to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_path: DEFAULT_API_PATH.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

impl ProviderConfig {
    /// Read the API key from the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_api_key(&self.id, Some(&self.api_key_env))
    }
}

/// Resolve API key from environment variable
pub fn resolve_api_key(provider: &str, var_name: Option<&str>) -> Option<String> {
    let raw = var_name.map(str::trim)?;
    if raw.is_empty() {
        return None;
    }
    match env::var(raw) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        Ok(_) => {
            warn!(provider, env_var = raw, "API key environment variable is empty");
            None
        }
        Err(err) => {
            warn!(
                provider,
                env_var = raw,
                %err,
                "API key environment variable is not set"
            );
            None
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct RawProvider {
    pub(super) id: Option<String>,
    pub(super) endpoint: Option<String>,
    pub(super) api_path: Option<String>,
    pub(super) api_key_env: Option<String>,
}

impl From<RawProvider> for ProviderConfig {
    fn from(raw: RawProvider) -> Self {
        let defaults = ProviderConfig::default();
        Self {
            id: raw.id.unwrap_or(defaults.id),
            endpoint: raw.endpoint.unwrap_or(defaults.endpoint),
            api_path: raw.api_path.unwrap_or(defaults.api_path),
            api_key_env: raw.api_key_env.unwrap_or(defaults.api_key_env),
        }
    }
}
