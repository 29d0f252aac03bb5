// Orchestrator lifecycle tests - launch, warmup, invoke, report, teardown
//
// The tool server must be released exactly once on every path past launch,
// and nothing after launch may run when launch fails.

#[path = "../common/mod.rs"]
mod common;

use common::{FakeLauncher, FakeRunner, FakeServer, RunnerBehaviour};
use docsum_core::config::{AppConfig, ServerConfig};
use docsum_core::orchestrator::{
    Completion, Orchestrator, OrchestratorError, OrchestratorSettings, Phase,
};
use docsum_core::tooling::{StdioLauncher, ToolInvokeError};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tempfile::tempdir;

fn settings() -> OrchestratorSettings {
    OrchestratorSettings::from(&AppConfig::default())
}

#[tokio::test]
async fn success_prints_final_output_and_releases_server_once() {
    let server = Arc::new(FakeServer::fetch());
    let runner = FakeRunner::new(RunnerBehaviour::Succeed("- summary".into()));
    let orchestrator = Orchestrator::new(FakeLauncher::with(Arc::clone(&server)), runner, settings());

    let completion = orchestrator.run().await.expect("run completes");

    assert_eq!(completion, Completion::Success("- summary".into()));
    assert_eq!(server.close_count(), 1);
}

#[tokio::test]
async fn configured_agent_gets_server_and_clock_tools() {
    let server = Arc::new(FakeServer::fetch());
    let runner = FakeRunner::new(RunnerBehaviour::Succeed("ok".into()));
    let orchestrator = Orchestrator::new(FakeLauncher::with(server), &runner, settings());

    orchestrator.run().await.expect("run completes");

    let tools = runner.seen_tools.lock().unwrap().clone();
    assert_eq!(tools, vec![r#"Server("fetch")"#, r#"Local("current_time")"#]);
}

#[tokio::test]
async fn runner_failure_is_reported_not_raised() {
    let server = Arc::new(FakeServer::fetch());
    let runner = FakeRunner::new(RunnerBehaviour::Fail("model exploded".into()));
    let orchestrator = Orchestrator::new(FakeLauncher::with(Arc::clone(&server)), &runner, settings());

    let completion = orchestrator
        .run()
        .await
        .expect("runner errors still complete the run");

    // Deliberate policy: a runner failure is a reported completion (exit 0).
    assert!(!completion.is_success());
    assert!(completion.line().starts_with("Error during Runner.run:"));
    assert!(completion.line().contains("model exploded"));
    assert_eq!(completion.line().lines().count(), 1);
    assert_eq!(runner.run_count(), 1);
    assert_eq!(server.close_count(), 1);
}

#[tokio::test]
async fn launch_failure_skips_every_later_phase() {
    let launcher = FakeLauncher::failing();
    let runner = FakeRunner::new(RunnerBehaviour::Succeed("unused".into()));
    let orchestrator = Orchestrator::new(&launcher, &runner, settings());

    let err = orchestrator.run().await.expect_err("launch fails");

    assert!(matches!(
        err,
        OrchestratorError::Launch(ToolInvokeError::Spawn { .. })
    ));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
    assert_eq!(runner.run_count(), 0);
}

#[tokio::test]
async fn not_ready_server_is_fatal_but_still_released() {
    let server = Arc::new(FakeServer {
        ready: false,
        ..FakeServer::fetch()
    });
    let runner = FakeRunner::new(RunnerBehaviour::Succeed("unused".into()));
    let orchestrator = Orchestrator::new(FakeLauncher::with(Arc::clone(&server)), &runner, settings());

    let err = orchestrator.run().await.expect_err("warmup fails");

    assert!(matches!(
        err,
        OrchestratorError::NotReady(ToolInvokeError::NotReady { .. })
    ));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(runner.run_count(), 0);
    assert_eq!(server.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn interruption_during_invoke_still_releases_server() {
    let server = Arc::new(FakeServer::fetch());
    let runner = FakeRunner::new(RunnerBehaviour::Hang);
    let orchestrator = Orchestrator::new(FakeLauncher::with(Arc::clone(&server)), &runner, settings());

    let err = orchestrator
        .run_until(tokio::time::sleep(Duration::from_millis(50)))
        .await
        .expect_err("interrupted");

    assert!(matches!(
        err,
        OrchestratorError::Interrupted {
            phase: Phase::Invoke
        }
    ));
    assert_eq!(err.exit_code(), 130);
    assert_eq!(runner.run_count(), 1);
    assert_eq!(server.close_count(), 1);
}

/// Reads the pid the server wrote, waiting for it to appear.
async fn wait_for_pid(path: &Path) -> u32 {
    for _ in 0..250 {
        if let Ok(text) = fs::read_to_string(path) {
            if let Ok(pid) = text.trim().parse() {
                return pid;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server never wrote its pid");
}

/// A zombie awaiting reaping counts as gone.
fn process_alive(pid: u32) -> bool {
    match fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(") ")
            .map(|(_, rest)| !rest.starts_with('Z'))
            .unwrap_or(false),
        Err(_) => false,
    }
}

#[tokio::test]
async fn interruption_during_launch_kills_the_half_started_server() {
    let dir = tempdir().expect("tempdir");
    let pid_file = dir.path().join("server.pid");
    // Never answers initialize, so the launch is still in its handshake.
    let server = ServerConfig::new(
        "slow",
        "/bin/sh",
        vec![
            "-c".to_string(),
            r#"echo $$ > "$1"; exec sleep 30"#.to_string(),
            "slow".to_string(),
            pid_file.display().to_string(),
        ],
    );
    let launcher = StdioLauncher::new(server, Duration::from_secs(30), Duration::from_secs(1));
    let runner = FakeRunner::new(RunnerBehaviour::Succeed("unused".into()));
    let orchestrator = Orchestrator::new(launcher, &runner, settings());

    let err = orchestrator
        .run_until(tokio::time::sleep(Duration::from_millis(300)))
        .await
        .expect_err("interrupted");

    assert!(matches!(
        err,
        OrchestratorError::Interrupted { phase: Phase::Init }
    ));
    assert_eq!(runner.run_count(), 0);

    let pid = wait_for_pid(&pid_file).await;
    let mut alive = process_alive(pid);
    for _ in 0..100 {
        if !alive {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        alive = process_alive(pid);
    }
    assert!(!alive, "server process {pid} survived the interrupted launch");
}
