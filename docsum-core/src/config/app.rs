use super::agent::AgentConfig;
use super::error::ConfigError;
use super::provider::ProviderConfig;
use super::runtime::RuntimeConfig;
use super::server::ServerConfig;
use crate::constants::DEFAULT_PROMPT;
use std::path::Path;

/// Everything a run needs, resolved from defaults and the optional config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub prompt: String,
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub runtime: RuntimeConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            agent: AgentConfig::default(),
            prompt: DEFAULT_PROMPT.to_string(),
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a file path, or from the default path if it exists.
    ///
    /// An explicit path must exist. Without one, a missing default file means
    /// the built-in defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        super::loader::load_config(path)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        super::loader::parse_config(content, Path::new("<inline>"))
    }

    /// Replace the prompt, keeping every other setting.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}
