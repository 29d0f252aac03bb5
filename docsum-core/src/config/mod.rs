pub mod agent;
pub mod app;
pub mod error;
pub mod loader;
pub mod provider;
pub mod runtime;
pub mod server;

pub use crate::constants::CONFIG_PATH;

pub use agent::AgentConfig;
pub use app::AppConfig;
pub use error::ConfigError;
pub use loader::load_env;
pub use provider::ProviderConfig;
pub use runtime::RuntimeConfig;
pub use server::ServerConfig;
