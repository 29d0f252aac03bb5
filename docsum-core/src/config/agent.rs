use crate::constants::{DEFAULT_AGENT_NAME, DEFAULT_INSTRUCTIONS, DEFAULT_MODEL};
use serde::Deserialize;

/// Declarative agent settings: who the agent is and which model it talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub name: String,
    pub model: String,
    pub instructions: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_AGENT_NAME.to_string(),
            model: DEFAULT_MODEL.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct RawAgent {
    pub(super) name: Option<String>,
    pub(super) model: Option<String>,
    pub(super) instructions: Option<String>,
}

impl From<RawAgent> for AgentConfig {
    fn from(raw: RawAgent) -> Self {
        let defaults = AgentConfig::default();
        Self {
            name: raw.name.unwrap_or(defaults.name),
            model: raw.model.unwrap_or(defaults.model),
            instructions: raw.instructions.unwrap_or(defaults.instructions),
        }
    }
}
