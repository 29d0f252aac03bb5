// Stdio MCP process tests - handshake, tool listing, tool calls, shutdown
//
// The servers here are small /bin/sh scripts that answer newline-delimited
// JSON-RPC requests by matching on the method name.

use docsum_core::config::ServerConfig;
use docsum_core::tooling::{
    McpProcess, ServerToolInfo, StdioLauncher, ToolInvokeError, ToolServerInterface,
    ToolServerLauncher,
};
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

const HANDSHAKE: Duration = Duration::from_secs(5);
const GRACE: Duration = Duration::from_secs(1);

/// Answers initialize, two pages of tools/list, and tools/call for
/// `fetch` (text), `broken` (isError) and anything else (JSON-RPC error).
const SCRIPTED_SERVER: &str = r##"
while IFS= read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/.*"id":"\([^"]*\)".*/\1/p')
  case "$line" in
    *'"method":"initialize"'*)
      printf '{"jsonrpc":"2.0","id":"%s","result":{"protocolVersion":"2025-06-18","serverInfo":{"name":"scripted","version":"0.0.1"},"capabilities":{"tools":{}},"instructions":"Use fetch for URLs."}}\n' "$id"
      ;;
    *'"method":"tools/list"'*)
      case "$line" in
        *'"cursor":"page-2"'*)
          printf '{"jsonrpc":"2.0","id":"%s","result":{"tools":[{"name":"broken","description":"Always fails","inputSchema":{"type":"object"}}]}}\n' "$id"
          ;;
        *)
          printf '{"jsonrpc":"2.0","id":"%s","result":{"tools":[{"name":"fetch","description":"Fetches a URL","inputSchema":{"type":"object","properties":{"url":{"type":"string"}}}}],"nextCursor":"page-2"}}\n' "$id"
          ;;
      esac
      ;;
    *'"method":"tools/call"'*)
      case "$line" in
        *'"name":"fetch"'*)
          printf '{"jsonrpc":"2.0","id":"%s","result":{"content":[{"type":"text","text":"# Changelog"},{"type":"text","text":"- Added a thing"}]}}\n' "$id"
          ;;
        *'"name":"broken"'*)
          printf '{"jsonrpc":"2.0","id":"%s","result":{"content":[{"type":"text","text":"upstream returned 503"}],"isError":true}}\n' "$id"
          ;;
        *)
          printf '{"jsonrpc":"2.0","id":"%s","error":{"code":-32602,"message":"unknown tool"}}\n' "$id"
          ;;
      esac
      ;;
  esac
done
"##;

/// Sends `ping` and an unsupported request to the client during the
/// handshake and appends the client's replies to the file named by `$1`.
/// The tool list grows after any `tools/call`, which also emits
/// `notifications/tools/list_changed` ahead of its result.
const NOTIFYING_SERVER: &str = r##"
log="$1"
listed=0
while IFS= read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/.*"id":"\([^"]*\)".*/\1/p')
  case "$line" in
    *'"id":"srv-'*)
      printf '%s\n' "$line" >> "$log"
      ;;
    *'"method":"initialize"'*)
      printf '{"jsonrpc":"2.0","id":"srv-1","method":"ping"}\n'
      printf '{"jsonrpc":"2.0","id":"srv-2","method":"sampling/createMessage","params":{}}\n'
      printf '{"jsonrpc":"2.0","id":"%s","result":{"protocolVersion":"2025-06-18","serverInfo":{"name":"notifying","version":"0.0.1"},"capabilities":{"tools":{"listChanged":true}}}}\n' "$id"
      ;;
    *'"method":"tools/list"'*)
      if [ "$listed" = 0 ]; then
        listed=1
        printf '{"jsonrpc":"2.0","id":"%s","result":{"tools":[{"name":"fetch"}]}}\n' "$id"
      else
        printf '{"jsonrpc":"2.0","id":"%s","result":{"tools":[{"name":"fetch"},{"name":"fetch_raw"}]}}\n' "$id"
      fi
      ;;
    *'"method":"tools/call"'*)
      printf '{"jsonrpc":"2.0","method":"notifications/tools/list_changed"}\n'
      printf '{"jsonrpc":"2.0","id":"%s","result":{"content":[{"type":"text","text":"installed"}]}}\n' "$id"
      ;;
  esac
done
"##;

fn sh_server(name: &str, script: &str) -> ServerConfig {
    ServerConfig::new(name, "/bin/sh", vec!["-c".to_string(), script.to_string()])
}

async fn started(script: &str) -> McpProcess {
    let process = McpProcess::with_shutdown_grace(sh_server("scripted", script), GRACE);
    process.start(HANDSHAKE).await.expect("handshake succeeds");
    process
}

#[tokio::test]
async fn handshake_stores_server_instructions() {
    let process = started(SCRIPTED_SERVER).await;

    assert!(process.is_running().await);
    assert_eq!(
        process.instructions().await.as_deref(),
        Some("Use fetch for URLs.")
    );

    process.close().await;
}

#[tokio::test]
async fn wait_ready_then_lists_every_page_of_tools() {
    let process = started(SCRIPTED_SERVER).await;

    process
        .wait_ready(Duration::from_secs(5), Duration::from_millis(20))
        .await
        .expect("server answers tools/list");
    let tools = process.list_tools().await.expect("tools listed");

    let names: Vec<&str> = tools.iter().map(|tool| tool.name.as_str()).collect();
    assert_eq!(names, vec!["fetch", "broken"]);
    assert_eq!(tools[0].description.as_deref(), Some("Fetches a URL"));
    assert!(tools[0].input_schema.is_some());

    process.close().await;
}

#[tokio::test]
async fn tool_call_results_are_rendered_as_text() {
    let process = started(SCRIPTED_SERVER).await;

    let output = process
        .invoke_tool("fetch", json!({"url": "https://windsurf.com/changelog"}))
        .await
        .expect("fetch succeeds");

    assert_eq!(output, "# Changelog\n- Added a thing");
    process.close().await;
}

#[tokio::test]
async fn tool_errors_and_rpc_errors_are_distinguished() {
    let process = started(SCRIPTED_SERVER).await;

    let failed = process
        .invoke_tool("broken", json!({}))
        .await
        .expect_err("isError result");
    match failed {
        ToolInvokeError::ToolFailed { tool, message, .. } => {
            assert_eq!(tool, "broken");
            assert_eq!(message, "upstream returned 503");
        }
        other => panic!("expected ToolFailed, got {other:?}"),
    }

    let rejected = process
        .invoke_tool("missing", json!({}))
        .await
        .expect_err("error response");
    assert!(matches!(
        rejected,
        ToolInvokeError::Rpc { code: -32602, .. }
    ));

    process.close().await;
}

#[tokio::test]
async fn close_is_idempotent_and_stops_the_child() {
    let process = started(SCRIPTED_SERVER).await;

    process.close().await;
    process.close().await;

    assert!(!process.is_running().await);
    let err = process
        .invoke_tool("fetch", json!({}))
        .await
        .expect_err("closed");
    assert!(matches!(err, ToolInvokeError::NotRunning { .. }));
}

#[tokio::test]
async fn server_that_exits_immediately_fails_the_handshake() {
    let process = McpProcess::with_shutdown_grace(sh_server("dead", "exit 0"), GRACE);

    let err = process.start(HANDSHAKE).await.expect_err("no handshake");

    assert!(matches!(err, ToolInvokeError::Handshake { .. }));
    assert!(!process.is_running().await);
}

#[tokio::test]
async fn silent_server_times_out_and_is_killed() {
    let process = McpProcess::with_shutdown_grace(sh_server("silent", "cat > /dev/null"), GRACE);

    let err = process
        .start(Duration::from_millis(200))
        .await
        .expect_err("handshake times out");

    match err {
        ToolInvokeError::Handshake { message, .. } => {
            assert!(message.contains("no initialize response"));
        }
        other => panic!("expected Handshake, got {other:?}"),
    }
    assert!(!process.is_running().await);
}

#[tokio::test]
async fn launcher_spawn_failure_leaves_nothing_behind() {
    let launcher = StdioLauncher::new(
        ServerConfig::new("fetch", "/definitely/not/uvx", vec!["mcp-server-fetch".into()]),
        HANDSHAKE,
        GRACE,
    );

    let err = match launcher.launch().await {
        Ok(_) => panic!("launch must fail"),
        Err(err) => err,
    };
    assert!(matches!(err, ToolInvokeError::Spawn { .. }));
}

#[tokio::test]
async fn launcher_returns_a_ready_handle() {
    let launcher = StdioLauncher::new(sh_server("scripted", SCRIPTED_SERVER), HANDSHAKE, GRACE);

    let server = launcher.launch().await.expect("launch succeeds");
    assert_eq!(server.name(), "scripted");
    server
        .wait_ready(Duration::from_secs(5), Duration::from_millis(20))
        .await
        .expect("ready");

    server.close().await;
}

fn notifying_server(log: &Path) -> ServerConfig {
    ServerConfig::new(
        "notifying",
        "/bin/sh",
        vec![
            "-c".to_string(),
            NOTIFYING_SERVER.to_string(),
            "notifying".to_string(),
            log.display().to_string(),
        ],
    )
}

async fn read_replies(log: &Path, expected: usize) -> Vec<Value> {
    for _ in 0..250 {
        let content = fs::read_to_string(log).unwrap_or_default();
        let replies: Vec<Value> = content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        if replies.len() >= expected {
            return replies;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server recorded fewer than {expected} replies");
}

#[tokio::test]
async fn answers_server_ping_and_rejects_unknown_requests() {
    let dir = tempdir().expect("tempdir");
    let log = dir.path().join("replies.log");
    let process = McpProcess::with_shutdown_grace(notifying_server(&log), GRACE);
    process.start(HANDSHAKE).await.expect("handshake succeeds");

    let replies = read_replies(&log, 2).await;
    let reply_to = |id: &str| {
        replies
            .iter()
            .find(|reply| reply["id"] == id)
            .cloned()
            .unwrap_or_else(|| panic!("no reply to {id}"))
    };

    let ping = reply_to("srv-1");
    assert_eq!(ping["jsonrpc"], "2.0");
    assert_eq!(ping["result"], json!({}));
    assert!(ping.get("error").is_none());

    let unsupported = reply_to("srv-2");
    assert_eq!(unsupported["error"]["code"], -32601);
    assert!(unsupported.get("result").is_none());

    process.close().await;
}

#[tokio::test]
async fn list_changed_notification_invalidates_cached_tools() {
    let dir = tempdir().expect("tempdir");
    let process =
        McpProcess::with_shutdown_grace(notifying_server(&dir.path().join("replies.log")), GRACE);
    process.start(HANDSHAKE).await.expect("handshake succeeds");

    let names = |tools: Vec<ServerToolInfo>| -> Vec<String> {
        tools.into_iter().map(|tool| tool.name).collect()
    };

    assert_eq!(names(process.list_tools().await.expect("listed")), vec!["fetch"]);
    // Served from the cache; the server would answer with two tools now.
    assert_eq!(names(process.list_tools().await.expect("cached")), vec!["fetch"]);

    let output = process
        .invoke_tool("install", json!({}))
        .await
        .expect("call succeeds");
    assert_eq!(output, "installed");

    assert_eq!(
        names(process.list_tools().await.expect("refetched")),
        vec!["fetch", "fetch_raw"]
    );

    process.close().await;
}

#[tokio::test]
async fn unbounded_ready_timeout_does_not_overflow() {
    let process = started(SCRIPTED_SERVER).await;

    process
        .wait_ready(Duration::MAX, Duration::from_millis(20))
        .await
        .expect("ready");

    process.close().await;
}
