use super::error::ToolInvokeError;
use super::interface::{ServerToolInfo, ToolServerInterface};
use crate::config::ServerConfig;
use crate::constants::PROTOCOL_VERSION;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

type Responder = oneshot::Sender<Result<Value, ToolInvokeError>>;

/// A stdio MCP server child process.
///
/// Messages are newline-delimited JSON-RPC 2.0. A background task reads the
/// child's stdout and routes responses to the request that is waiting on them.
#[derive(Clone)]
pub struct McpProcess {
    inner: Arc<McpProcessInner>,
}

struct McpProcessInner {
    server: ServerConfig,
    shutdown_grace: Duration,
    state: AsyncMutex<Option<RunningState>>,
    writer: AsyncMutex<Option<BufWriter<ChildStdin>>>,
    pending: AsyncMutex<HashMap<String, Responder>>,
    id_counter: AtomicU64,
    instructions: AsyncMutex<Option<String>>,
    tool_cache: AsyncMutex<Option<Vec<ServerToolInfo>>>,
    closed: AtomicBool,
}

struct RunningState {
    child: Child,
}

impl McpProcess {
    pub fn new(server: ServerConfig) -> Self {
        Self::with_shutdown_grace(server, DEFAULT_SHUTDOWN_GRACE)
    }

    /// `grace` is how long [`close`](ToolServerInterface::close) waits for the
    /// child to exit on its own before killing it.
    pub fn with_shutdown_grace(server: ServerConfig, grace: Duration) -> Self {
        Self {
            inner: Arc::new(McpProcessInner {
                server,
                shutdown_grace: grace,
                state: AsyncMutex::new(None),
                writer: AsyncMutex::new(None),
                pending: AsyncMutex::new(HashMap::new()),
                id_counter: AtomicU64::new(1),
                instructions: AsyncMutex::new(None),
                tool_cache: AsyncMutex::new(None),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Spawn the child and run the `initialize` handshake.
    ///
    /// On any failure the child is killed before the error is returned.
    pub async fn start(&self, handshake_timeout: Duration) -> Result<(), ToolInvokeError> {
        self.inner.start(handshake_timeout).await
    }

    pub async fn is_running(&self) -> bool {
        self.inner.is_alive().await
    }
}

#[async_trait]
impl ToolServerInterface for McpProcess {
    fn name(&self) -> &str {
        &self.inner.server.name
    }

    async fn instructions(&self) -> Option<String> {
        self.inner.instructions.lock().await.clone()
    }

    async fn list_tools(&self) -> Result<Vec<ServerToolInfo>, ToolInvokeError> {
        if let Some(cached) = self.inner.tool_cache.lock().await.clone() {
            return Ok(cached);
        }
        self.inner.refresh_tools(None).await
    }

    async fn invoke_tool(&self, tool: &str, arguments: Value) -> Result<String, ToolInvokeError> {
        self.inner.call_tool(tool, arguments).await
    }

    async fn wait_ready(
        &self,
        limit: Duration,
        poll_interval: Duration,
    ) -> Result<(), ToolInvokeError> {
        self.inner.wait_ready(limit, poll_interval).await
    }

    async fn close(&self) {
        self.inner.close().await
    }
}

impl McpProcessInner {
    async fn start(self: &Arc<Self>, handshake_timeout: Duration) -> Result<(), ToolInvokeError> {
        {
            let state = self.state.lock().await;
            if state.is_some() {
                return Ok(());
            }
        }

        let mut command = Command::new(&self.server.command);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &self.server.workdir {
            command.current_dir(dir);
        }
        if !self.server.args.is_empty() {
            command.args(&self.server.args);
        }
        for (key, value) in &self.server.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| ToolInvokeError::Spawn {
            server: self.server.name.clone(),
            source,
        })?;
        debug!(server = %self.server.name, pid = ?child.id(), "MCP server process spawned");

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let (Some(stdin), Some(stdout)) = (stdin, stdout) else {
            let _ = child.kill().await;
            return Err(self.transport_error("failed to capture server stdio"));
        };

        {
            let mut writer = self.writer.lock().await;
            *writer = Some(BufWriter::new(stdin));
        }

        {
            let mut state = self.state.lock().await;
            *state = Some(RunningState { child });
        }

        let reader = Arc::downgrade(self);
        tokio::spawn(reader_loop(reader, stdout));

        let outcome = match timeout(handshake_timeout, self.initialize_sequence()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(ToolInvokeError::Handshake {
                server: self.server.name.clone(),
                message: err.to_string(),
            }),
            Err(_) => Err(ToolInvokeError::Handshake {
                server: self.server.name.clone(),
                message: format!("no initialize response within {handshake_timeout:?}"),
            }),
        };

        if outcome.is_err() {
            self.reset().await;
        }
        outcome
    }

    async fn initialize_sequence(&self) -> Result<(), ToolInvokeError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "title": "docsum"
            },
            "capabilities": {}
        });
        let init_result = self.send_request("initialize", params, None).await?;

        let negotiated = init_result
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let server_info = init_result.get("serverInfo");
        let remote_name = server_info
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("");
        let remote_version = server_info
            .and_then(|s| s.get("version"))
            .and_then(Value::as_str)
            .unwrap_or("");
        info!(
            server = %self.server.name,
            protocol = negotiated,
            remote_name,
            remote_version,
            "MCP handshake completed"
        );

        if let Some(text) = init_result.get("instructions").and_then(Value::as_str) {
            let mut instructions = self.instructions.lock().await;
            *instructions = Some(text.to_string());
        }
        self.send_notification("notifications/initialized", json!({}))
            .await
    }

    async fn wait_ready(
        &self,
        limit: Duration,
        poll_interval: Duration,
    ) -> Result<(), ToolInvokeError> {
        let started = Instant::now();
        // Far enough to never fire when `limit` is effectively unbounded.
        let deadline = started
            .checked_add(limit)
            .unwrap_or_else(|| started + Duration::from_secs(60 * 60 * 24 * 365));
        let mut attempts = 0u32;
        let mut last_error = String::from("no attempt completed");

        loop {
            if !self.is_alive().await {
                return Err(ToolInvokeError::NotReady {
                    server: self.server.name.clone(),
                    waited: started.elapsed(),
                    message: "process is not running".to_string(),
                });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ToolInvokeError::NotReady {
                    server: self.server.name.clone(),
                    waited: started.elapsed(),
                    message: last_error,
                });
            }

            attempts += 1;
            match self.refresh_tools(Some(remaining)).await {
                Ok(tools) => {
                    info!(
                        server = %self.server.name,
                        attempts,
                        tools = tools.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "MCP server ready"
                    );
                    return Ok(());
                }
                Err(err) => {
                    debug!(server = %self.server.name, attempts, %err, "MCP server not ready yet");
                    last_error = err.to_string();
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            sleep(poll_interval.min(remaining)).await;
        }
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<String, ToolInvokeError> {
        let params = json!({
            "name": tool,
            "arguments": match arguments {
                Value::Null => Value::Object(Default::default()),
                other => other,
            }
        });
        let result = self.send_request("tools/call", params, None).await?;
        let text = render_tool_content(&result);

        if result.get("isError").and_then(Value::as_bool).unwrap_or(false) {
            return Err(ToolInvokeError::ToolFailed {
                server: self.server.name.clone(),
                tool: tool.to_string(),
                message: text,
            });
        }
        Ok(text)
    }

    async fn refresh_tools(
        &self,
        limit: Option<Duration>,
    ) -> Result<Vec<ServerToolInfo>, ToolInvokeError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = match &cursor {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let result = self.send_request("tools/list", params, limit).await?;
            tools.extend(parse_tool_list(&result));

            cursor = result
                .get("nextCursor")
                .and_then(Value::as_str)
                .filter(|c| !c.is_empty())
                .map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }

        debug!(server = %self.server.name, count = tools.len(), "Tool catalogue refreshed");
        *self.tool_cache.lock().await = Some(tools.clone());
        Ok(tools)
    }

    async fn handle_line(&self, raw: &str) {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }
        if !trimmed.starts_with('{') {
            debug!(
                server = %self.server.name,
                line = trimmed,
                "skipping non-JSON line from MCP server"
            );
            return;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => {
                if let Err(err) = self.process_inbound_message(value).await {
                    warn!(
                        server = %self.server.name,
                        %err,
                        "failed to process message from MCP server"
                    );
                }
            }
            Err(source) => {
                warn!(
                    server = %self.server.name,
                    line = trimmed,
                    %source,
                    "received invalid JSON from MCP server"
                );
            }
        }
    }

    async fn process_inbound_message(&self, value: Value) -> Result<(), ToolInvokeError> {
        match (value.get("id").cloned(), value.get("method").is_some()) {
            (Some(id), true) => self.handle_server_request(id, value).await,
            (Some(id), false) => {
                self.handle_response(id, value).await;
                Ok(())
            }
            (None, true) => {
                self.handle_notification(value).await;
                Ok(())
            }
            (None, false) => Ok(()),
        }
    }

    async fn handle_response(&self, id: Value, value: Value) {
        let Some(key) = response_key(&id) else {
            return;
        };

        let responder = self.pending.lock().await.remove(&key);
        let Some(sender) = responder else {
            debug!(
                server = %self.server.name,
                response_id = %key,
                "received response for unknown request"
            );
            return;
        };

        let outcome = match value.get("error") {
            Some(error) => {
                let code = error.get("code").and_then(Value::as_i64).unwrap_or(-32000);
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string();
                Err(ToolInvokeError::Rpc {
                    server: self.server.name.clone(),
                    code,
                    message,
                })
            }
            None => Ok(value.get("result").cloned().unwrap_or(Value::Null)),
        };
        let _ = sender.send(outcome);
    }

    async fn handle_server_request(&self, id: Value, value: Value) -> Result<(), ToolInvokeError> {
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default();
        match method {
            "ping" => self.send_response(id, json!({})).await,
            other => {
                warn!(
                    server = %self.server.name,
                    method = other,
                    "server sent unsupported request"
                );
                let error = json!({
                    "code": -32601,
                    "message": format!("client does not implement method '{other}'"),
                });
                self.send_error(id, error).await
            }
        }
    }

    async fn handle_notification(&self, value: Value) {
        let Some(method) = value.get("method").and_then(Value::as_str) else {
            return;
        };
        debug!(server = %self.server.name, method, "received notification from server");
        if method == "notifications/tools/list_changed" {
            // Refetched lazily; a request from the reader task would never see its reply.
            self.tool_cache.lock().await.take();
        }
    }

    async fn send_request(
        &self,
        method: &str,
        params: Value,
        limit: Option<Duration>,
    ) -> Result<Value, ToolInvokeError> {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });
        if let Err(err) = self.write_message(&payload).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }

        let received = match limit {
            Some(limit) => match timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    self.pending.lock().await.remove(&id);
                    return Err(ToolInvokeError::Timeout {
                        server: self.server.name.clone(),
                        method: method.to_string(),
                        after: limit,
                    });
                }
            },
            None => rx.await,
        };

        match received {
            Ok(result) => result,
            Err(_) => Err(ToolInvokeError::Cancelled {
                server: self.server.name.clone(),
            }),
        }
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<(), ToolInvokeError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        });
        self.write_message(&payload).await
    }

    async fn send_response(&self, id: Value, result: Value) -> Result<(), ToolInvokeError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result
        });
        self.write_message(&payload).await
    }

    async fn send_error(&self, id: Value, error: Value) -> Result<(), ToolInvokeError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": error
        });
        self.write_message(&payload).await
    }

    async fn write_message(&self, message: &Value) -> Result<(), ToolInvokeError> {
        let mut encoded =
            serde_json::to_vec(message).map_err(|source| ToolInvokeError::InvalidJson {
                server: self.server.name.clone(),
                source,
            })?;
        encoded.push(b'\n');

        let mut writer = self.writer.lock().await;
        let stream = writer.as_mut().ok_or_else(|| ToolInvokeError::NotRunning {
            server: self.server.name.clone(),
        })?;
        stream
            .write_all(&encoded)
            .await
            .map_err(|source| self.transport_error(source.to_string()))?;
        stream
            .flush()
            .await
            .map_err(|source| self.transport_error(source.to_string()))?;
        Ok(())
    }

    async fn is_alive(&self) -> bool {
        let mut state = self.state.lock().await;
        match state.as_mut() {
            Some(running) => matches!(running.child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Graceful shutdown: close stdin, give the child time to exit, then kill it.
    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!(server = %self.server.name, "MCP server already closed");
            return;
        }

        self.writer.lock().await.take();

        let running = self.state.lock().await.take();
        if let Some(mut running) = running {
            match timeout(self.shutdown_grace, running.child.wait()).await {
                Ok(Ok(status)) => {
                    info!(server = %self.server.name, %status, "MCP server exited");
                }
                Ok(Err(err)) => {
                    warn!(server = %self.server.name, %err, "failed to wait for MCP server");
                }
                Err(_) => {
                    warn!(
                        server = %self.server.name,
                        grace_ms = self.shutdown_grace.as_millis() as u64,
                        "MCP server did not exit after stdin closed; killing"
                    );
                    if let Err(err) = running.child.kill().await {
                        debug!(server = %self.server.name, %err, "failed to kill MCP server");
                    }
                }
            }
        }

        self.fail_all_pending().await;
        self.tool_cache.lock().await.take();
    }

    async fn reset(&self) {
        self.writer.lock().await.take();

        let running = self.state.lock().await.take();
        if let Some(mut running) = running {
            if let Err(err) = running.child.kill().await {
                debug!(
                    server = %self.server.name,
                    %err,
                    "failed to kill MCP server process (may have already exited)"
                );
            }
        }

        self.fail_all_pending().await;
        self.tool_cache.lock().await.take();
        self.instructions.lock().await.take();
    }

    async fn fail_all_pending(&self) {
        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(ToolInvokeError::Terminated {
                server: self.server.name.clone(),
            }));
        }
    }

    fn next_id(&self) -> String {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        format!("req-{id}")
    }

    fn transport_error(&self, message: impl Into<String>) -> ToolInvokeError {
        ToolInvokeError::Transport {
            server: self.server.name.clone(),
            message: message.into(),
        }
    }
}

/// Routes the child's stdout to the process handle.
///
/// Only a weak handle is held between lines, so dropping the last
/// [`McpProcess`] (for example an abandoned launch) drops the child and
/// `kill_on_drop` terminates it.
async fn reader_loop(inner: Weak<McpProcessInner>, stdout: ChildStdout) {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(raw)) = lines.next_line().await {
        let Some(process) = inner.upgrade() else {
            return;
        };
        process.handle_line(&raw).await;
    }

    if let Some(process) = inner.upgrade() {
        debug!(server = %process.server.name, "MCP server stdout closed");
        process.reset().await;
    }
}

fn response_key(id: &Value) -> Option<String> {
    match id {
        Value::String(value) => Some(value.clone()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}

fn parse_tool_list(result: &Value) -> Vec<ServerToolInfo> {
    result
        .get("tools")
        .and_then(Value::as_array)
        .map(|array| {
            array
                .iter()
                .filter_map(|tool| {
                    let name = tool.get("name").and_then(Value::as_str)?;
                    Some(ServerToolInfo {
                        name: name.to_string(),
                        description: tool
                            .get("description")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        input_schema: tool.get("inputSchema").cloned(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Flatten a `tools/call` result into text for the model.
fn render_tool_content(result: &Value) -> String {
    let parts: Vec<String> = result
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| match item.get("type").and_then(Value::as_str) {
                    Some("text") => item
                        .get("text")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    Some("resource") => {
                        let resource = item.get("resource");
                        resource
                            .and_then(|r| r.get("text"))
                            .or_else(|| resource.and_then(|r| r.get("uri")))
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string()
                    }
                    Some(kind) => {
                        let mime = item
                            .get("mimeType")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown");
                        format!("[{kind} content: {mime}]")
                    }
                    None => item.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    if parts.is_empty() {
        return result
            .get("structuredContent")
            .map(Value::to_string)
            .unwrap_or_default();
    }
    parts.join("\n")
}
