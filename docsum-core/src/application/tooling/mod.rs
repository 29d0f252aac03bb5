//! Tools available to the agent: local callables and tools delegated to an
//! MCP server running as a child process.

mod clock;
mod error;
mod interface;
mod launcher;
mod local;
mod process;

pub use clock::{CLOCK_FORMAT, ClockTool, current_time};
pub use error::ToolInvokeError;
pub use interface::{ServerToolInfo, ToolServerInterface, ToolServerLauncher};
pub use launcher::StdioLauncher;
pub use local::{LocalTool, no_arguments_schema};
pub use process::McpProcess;
