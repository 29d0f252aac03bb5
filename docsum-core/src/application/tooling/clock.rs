use super::local::LocalTool;
use crate::agent::ToolError;
use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;

/// `strftime` pattern of the clock tool output, e.g. `2025-06-01 14:03:59`.
pub const CLOCK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local date-time formatted with [`CLOCK_FORMAT`].
pub fn current_time() -> String {
    Local::now().format(CLOCK_FORMAT).to_string()
}

/// Zero-argument tool returning the local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockTool;

#[async_trait]
impl LocalTool for ClockTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Return the current local time in ISO-like format."
    }

    async fn call(&self, _arguments: Value) -> Result<String, ToolError> {
        Ok(current_time())
    }
}
