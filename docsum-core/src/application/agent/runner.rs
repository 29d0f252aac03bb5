use super::definition::{AgentDefinition, ToolRef};
use super::errors::{AgentError, ToolError};
use super::models::{AgentStep, RunResult};
use crate::application::tooling::{LocalTool, ToolServerInterface, no_arguments_schema};
use crate::model::{ModelClient, ModelRequest};
use crate::types::{ChatMessage, ToolCall, ToolSchema};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Maximum characters of tool output echoed into debug logs
const LOG_PREVIEW_CHARS: usize = 200;

/// Submits a prompt to an agent and waits for the final answer.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, agent: &AgentDefinition, prompt: &str) -> Result<RunResult, AgentError>;
}

/// Tool-calling loop over a chat-completions model.
pub struct Runner<M: ModelClient> {
    model: M,
    max_turns: usize,
}

enum Route {
    Local(Arc<dyn LocalTool>),
    Server(Arc<dyn ToolServerInterface>),
}

struct ToolCatalogue {
    schemas: Vec<ToolSchema>,
    routes: HashMap<String, Route>,
}

impl<M: ModelClient> Runner<M> {
    pub fn new(model: M, max_turns: usize) -> Self {
        Self {
            model,
            max_turns: max_turns.max(1),
        }
    }

    async fn resolve_tools(agent: &AgentDefinition) -> Result<ToolCatalogue, AgentError> {
        let mut catalogue = ToolCatalogue {
            schemas: Vec::new(),
            routes: HashMap::new(),
        };

        for tool in agent.tools() {
            match tool {
                ToolRef::Local(local) => {
                    catalogue.insert(local.schema(), Route::Local(Arc::clone(local)))?;
                }
                ToolRef::Server(server) => {
                    let listed = server.list_tools().await.map_err(|source| {
                        AgentError::ToolCatalogue {
                            server: server.name().to_string(),
                            source,
                        }
                    })?;
                    for info in listed {
                        let schema = ToolSchema {
                            name: info.name,
                            description: info.description.unwrap_or_default(),
                            parameters: info.input_schema.unwrap_or_else(no_arguments_schema),
                        };
                        catalogue.insert(schema, Route::Server(Arc::clone(server)))?;
                    }
                }
            }
        }

        Ok(catalogue)
    }

    async fn system_prompt(agent: &AgentDefinition) -> String {
        let mut prompt = agent.instructions().to_string();
        for server in agent.servers() {
            if let Some(notes) = server.instructions().await {
                let notes = notes.trim();
                if !notes.is_empty() {
                    prompt.push_str(&format!("\n\nTool server '{}': {notes}", server.name()));
                }
            }
        }
        prompt
    }

    async fn dispatch(&self, catalogue: &ToolCatalogue, call: &ToolCall) -> AgentStep {
        let arguments = parse_arguments(call);
        let outcome = match &arguments {
            Ok(args) => execute(catalogue, &call.name, args.clone()).await,
            Err(err) => Err(ToolError::InvalidArguments {
                tool: call.name.clone(),
                reason: err.to_string(),
            }),
        };

        match outcome {
            Ok(output) => {
                debug!(
                    tool = %call.name,
                    preview = %preview(&output),
                    "Tool call succeeded"
                );
                AgentStep {
                    tool: call.name.clone(),
                    arguments: arguments.unwrap_or(Value::Null),
                    success: true,
                    output,
                }
            }
            Err(err) => {
                warn!(tool = %call.name, %err, "Tool call failed");
                AgentStep {
                    tool: call.name.clone(),
                    arguments: arguments.unwrap_or(Value::Null),
                    success: false,
                    output: format!(
                        "An error occurred while running the tool. Please try again. Error: {err}"
                    ),
                }
            }
        }
    }
}

#[async_trait]
impl<M: ModelClient> AgentRunner for Runner<M> {
    async fn run(&self, agent: &AgentDefinition, prompt: &str) -> Result<RunResult, AgentError> {
        let run_id = Uuid::new_v4();
        info!(%run_id, agent = agent.name(), model = agent.model(), "Agent run started");

        let catalogue = Self::resolve_tools(agent).await?;
        debug!(
            %run_id,
            tools = ?catalogue.schemas.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            "Tool catalogue resolved"
        );

        let mut messages = vec![
            ChatMessage::system(Self::system_prompt(agent).await),
            ChatMessage::user(prompt),
        ];
        let mut steps = Vec::new();

        for turn in 1..=self.max_turns {
            let request = ModelRequest {
                model: agent.model().to_string(),
                messages: messages.clone(),
                tools: catalogue.schemas.clone(),
            };
            let response = self.model.chat(request).await?;

            if !response.wants_tools() {
                info!(%run_id, turn, steps = steps.len(), "Agent produced final output");
                return Ok(RunResult {
                    run_id,
                    agent: agent.name().to_string(),
                    final_output: response.message.content,
                    steps,
                    turns: turn,
                });
            }

            let calls = response.message.tool_calls.clone();
            info!(%run_id, turn, calls = calls.len(), "Model requested tool calls");
            messages.push(response.message);

            for call in &calls {
                let step = self.dispatch(&catalogue, call).await;
                messages.push(ChatMessage::tool_result(&call.id, &step.output));
                steps.push(step);
            }
        }

        warn!(%run_id, max_turns = self.max_turns, "Agent exceeded max turns");
        Err(AgentError::MaxTurnsExceeded {
            max_turns: self.max_turns,
        })
    }
}

impl ToolCatalogue {
    fn insert(&mut self, schema: ToolSchema, route: Route) -> Result<(), AgentError> {
        if self.routes.contains_key(&schema.name) {
            return Err(AgentError::DuplicateTool(schema.name));
        }
        self.routes.insert(schema.name.clone(), route);
        self.schemas.push(schema);
        Ok(())
    }
}

async fn execute(catalogue: &ToolCatalogue, name: &str, arguments: Value) -> Result<String, ToolError> {
    match catalogue.routes.get(name) {
        Some(Route::Local(tool)) => tool.call(arguments).await,
        Some(Route::Server(server)) => server
            .invoke_tool(name, arguments)
            .await
            .map_err(|source| ToolError::Execution {
                tool: name.to_string(),
                source,
            }),
        None => Err(ToolError::UnknownTool(name.to_string())),
    }
}

/// Models send `""` for calls without arguments; treat that as `{}`.
fn parse_arguments(call: &ToolCall) -> Result<Value, serde_json::Error> {
    let raw = call.arguments.trim();
    if raw.is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(raw)
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
    if text.chars().count() > LOG_PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}
