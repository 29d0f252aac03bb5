use super::error::ToolInvokeError;
use super::interface::{ToolServerInterface, ToolServerLauncher};
use super::process::McpProcess;
use crate::config::ServerConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Launches an MCP server as a child process speaking JSON-RPC over stdio.
#[derive(Debug, Clone)]
pub struct StdioLauncher {
    config: ServerConfig,
    handshake_timeout: Duration,
    shutdown_grace: Duration,
}

impl StdioLauncher {
    pub fn new(config: ServerConfig, handshake_timeout: Duration, shutdown_grace: Duration) -> Self {
        Self {
            config,
            handshake_timeout,
            shutdown_grace,
        }
    }
}

#[async_trait]
impl ToolServerLauncher for StdioLauncher {
    async fn launch(&self) -> Result<Arc<dyn ToolServerInterface>, ToolInvokeError> {
        info!(
            server = %self.config.name,
            command = %self.config.command.display(),
            args = ?self.config.args,
            "Launching MCP server"
        );
        let process = McpProcess::with_shutdown_grace(self.config.clone(), self.shutdown_grace);
        process.start(self.handshake_timeout).await?;
        Ok(Arc::new(process))
    }
}
