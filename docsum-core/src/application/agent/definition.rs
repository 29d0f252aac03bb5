use crate::application::tooling::{ClockTool, LocalTool, ToolServerInterface};
use crate::config::AgentConfig;
use std::fmt;
use std::sync::Arc;

/// A tool made available to an agent.
#[derive(Clone)]
pub enum ToolRef {
    /// Implemented in-process.
    Local(Arc<dyn LocalTool>),
    /// Every tool the server lists, called over its protocol channel.
    Server(Arc<dyn ToolServerInterface>),
}

impl fmt::Debug for ToolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolRef::Local(tool) => f.debug_tuple("Local").field(&tool.name()).finish(),
            ToolRef::Server(server) => f.debug_tuple("Server").field(&server.name()).finish(),
        }
    }
}

/// Immutable agent configuration consumed by a runner.
#[derive(Clone, Debug)]
pub struct AgentDefinition {
    name: String,
    model: String,
    instructions: String,
    tools: Vec<ToolRef>,
}

impl AgentDefinition {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            instructions: instructions.into(),
            tools: Vec::new(),
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(&config.name, &config.model, &config.instructions)
    }

    pub fn with_tool(mut self, tool: impl LocalTool + 'static) -> Self {
        self.tools.push(ToolRef::Local(Arc::new(tool)));
        self
    }

    pub fn with_server(mut self, server: Arc<dyn ToolServerInterface>) -> Self {
        self.tools.push(ToolRef::Server(server));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn tools(&self) -> &[ToolRef] {
        &self.tools
    }

    pub fn servers(&self) -> impl Iterator<Item = &Arc<dyn ToolServerInterface>> {
        self.tools.iter().filter_map(|tool| match tool {
            ToolRef::Server(server) => Some(server),
            ToolRef::Local(_) => None,
        })
    }
}

/// The summariser agent: tools delegated to `server` plus the local clock.
pub fn build_agent(config: &AgentConfig, server: Arc<dyn ToolServerInterface>) -> AgentDefinition {
    AgentDefinition::from_config(config)
        .with_server(server)
        .with_tool(ClockTool)
}
