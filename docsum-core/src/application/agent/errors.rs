use crate::application::tooling::ToolInvokeError;
use crate::model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("failed to list tools of MCP server '{server}': {source}")]
    ToolCatalogue {
        server: String,
        #[source]
        source: ToolInvokeError,
    },
    #[error("tool name '{0}' is provided more than once")]
    DuplicateTool(String),
    #[error("agent exceeded the maximum of {max_turns} model turns")]
    MaxTurnsExceeded { max_turns: usize },
}

/// Failure of a single tool call. Reported back to the model rather than
/// aborting the run.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool requested: {0}")]
    UnknownTool(String),
    #[error("invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error("failed to execute tool '{tool}': {source}")]
    Execution {
        tool: String,
        #[source]
        source: ToolInvokeError,
    },
}
