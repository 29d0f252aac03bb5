use super::error::ToolInvokeError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerToolInfo {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Option<Value>,
}

/// An open connection to a tool server.
///
/// Handles are obtained from a [`ToolServerLauncher`] and must be released
/// with [`close`](ToolServerInterface::close) once the run is over.
#[async_trait]
pub trait ToolServerInterface: Send + Sync {
    fn name(&self) -> &str;

    /// Free-form usage notes the server sent during the handshake.
    async fn instructions(&self) -> Option<String>;

    async fn list_tools(&self) -> Result<Vec<ServerToolInfo>, ToolInvokeError>;

    /// Call a tool and return its textual result.
    async fn invoke_tool(&self, tool: &str, arguments: Value) -> Result<String, ToolInvokeError>;

    /// Poll until the server answers requests, giving up after `timeout`.
    async fn wait_ready(
        &self,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<(), ToolInvokeError>;

    /// Shut the server down. Calling it more than once is a no-op.
    async fn close(&self);
}

/// Starts a tool server and completes its protocol handshake.
///
/// On failure nothing is left running.
#[async_trait]
pub trait ToolServerLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn ToolServerInterface>, ToolInvokeError>;
}
