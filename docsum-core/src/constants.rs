//! Application constants
//!
//! Single source of truth for paths and built-in defaults.

/// Default configuration file path
pub const CONFIG_PATH: &str = "config/docsum.toml";

/// Default environment file name, searched from the working directory upward
pub const ENV_FILE: &str = ".env";

/// MCP protocol revision announced during the handshake
pub const PROTOCOL_VERSION: &str = "2025-06-18";

pub const DEFAULT_AGENT_NAME: &str = "DocSummariser";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_INSTRUCTIONS: &str = "You are a concise, helpful assistant. \
Summarise requested web pages in clear bullet points.";

pub const DEFAULT_PROMPT: &str = "Retrieve https://windsurf.com/changelog and provide:\n\
1. A brief summary of the latest changes.\n\
2. The timestamp returned by the current_time tool.";

pub const DEFAULT_SERVER_NAME: &str = "fetch";
pub const DEFAULT_SERVER_COMMAND: &str = "uvx";
pub const DEFAULT_SERVER_ARGS: &[&str] = &["mcp-server-fetch"];

/// OpenAI-compatible endpoint used when no provider section is configured
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com";
pub const DEFAULT_API_PATH: &str = "/v1/chat/completions";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
