//! Message adapters - convert between domain types and the OpenAI wire format

use crate::types::{ChatMessage, MessageRole, ToolSchema};
use serde_json::{Map, Value, json};

/// Adapter for converting messages to different API formats
pub struct MessageAdapter;

impl MessageAdapter {
    /// Convert messages to OpenAI-style format
    pub fn to_openai_format(messages: &[ChatMessage]) -> Vec<Value> {
        messages.iter().map(Self::message_to_openai).collect()
    }

    /// Convert tool schemas to the OpenAI `tools` array
    pub fn tools_to_openai_format(tools: &[ToolSchema]) -> Vec<Value> {
        tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                })
            })
            .collect()
    }

    fn message_to_openai(message: &ChatMessage) -> Value {
        let mut map = Map::new();
        map.insert("role".into(), Value::String(message.role.as_str().into()));

        // Assistant turns that only carry tool calls send `content: null`.
        let content = if message.role == MessageRole::Assistant
            && message.content.is_empty()
            && !message.tool_calls.is_empty()
        {
            Value::Null
        } else {
            Value::String(message.content.clone())
        };
        map.insert("content".into(), content);

        if !message.tool_calls.is_empty() {
            let calls = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments,
                        }
                    })
                })
                .collect();
            map.insert("tool_calls".into(), Value::Array(calls));
        }
        if let Some(id) = &message.tool_call_id {
            map.insert("tool_call_id".into(), Value::String(id.clone()));
        }
        Value::Object(map)
    }
}
