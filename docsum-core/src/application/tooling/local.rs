use crate::agent::ToolError;
use crate::types::ToolSchema;
use async_trait::async_trait;
use serde_json::{Value, json};

/// A tool implemented in-process.
#[async_trait]
pub trait LocalTool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value {
        no_arguments_schema()
    }

    async fn call(&self, arguments: Value) -> Result<String, ToolError>;

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Schema for a tool that takes no arguments.
pub fn no_arguments_schema() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "additionalProperties": false
    })
}
