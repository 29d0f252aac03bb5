//! Single-shot run: launch the tool server, wait for it, build the agent,
//! submit the prompt, report, and always shut the server down.

use crate::agent::{AgentRunner, RunResult, build_agent};
use crate::config::{AgentConfig, AppConfig};
use crate::tooling::{ToolInvokeError, ToolServerInterface, ToolServerLauncher};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Prefix of the line printed when the runner fails
pub const RUNNER_ERROR_PREFIX: &str = "Error during Runner.run:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Warmup,
    Configure,
    Invoke,
    Report,
    Teardown,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::Warmup => "warmup",
            Phase::Configure => "configure",
            Phase::Invoke => "invoke",
            Phase::Report => "report",
            Phase::Teardown => "teardown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of a run that reached teardown normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The agent's final output.
    Success(String),
    /// The runner failed; the diagnostic line to show the user.
    ReportedError(String),
}

impl Completion {
    pub fn line(&self) -> &str {
        match self {
            Completion::Success(text) | Completion::ReportedError(text) => text,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Completion::Success(_))
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.line())
    }
}

/// Failures that end a run without a [`Completion`].
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("failed to launch tool server: {0}")]
    Launch(#[source] ToolInvokeError),
    #[error("tool server not ready: {0}")]
    NotReady(#[source] ToolInvokeError),
    #[error("run interrupted during {phase}")]
    Interrupted { phase: Phase },
}

impl OrchestratorError {
    pub fn exit_code(&self) -> i32 {
        match self {
            OrchestratorError::Launch(_) | OrchestratorError::NotReady(_) => 1,
            OrchestratorError::Interrupted { .. } => 130,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub agent: AgentConfig,
    pub prompt: String,
    pub ready_timeout: Duration,
    pub ready_poll_interval: Duration,
}

impl From<&AppConfig> for OrchestratorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            agent: config.agent.clone(),
            prompt: config.prompt.clone(),
            ready_timeout: config.runtime.ready_timeout,
            ready_poll_interval: config.runtime.ready_poll_interval,
        }
    }
}

pub struct Orchestrator<L, R> {
    launcher: L,
    runner: R,
    settings: OrchestratorSettings,
}

impl<L, R> Orchestrator<L, R>
where
    L: ToolServerLauncher,
    R: AgentRunner,
{
    pub fn new(launcher: L, runner: R, settings: OrchestratorSettings) -> Self {
        Self {
            launcher,
            runner,
            settings,
        }
    }

    pub async fn run(&self) -> Result<Completion, OrchestratorError> {
        self.run_until(std::future::pending()).await
    }

    /// Run to completion, or stop early when `shutdown` resolves.
    ///
    /// Once the tool server is launched it is closed exactly once, whatever
    /// happens afterwards.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<Completion, OrchestratorError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        enter(Phase::Init);
        let server = interruptible(Phase::Init, self.launcher.launch(), shutdown.as_mut())
            .await?
            .map_err(OrchestratorError::Launch)?;

        let outcome = self.drive(&server, shutdown.as_mut()).await;

        enter(Phase::Teardown);
        server.close().await;
        info!(server = server.name(), "Tool server released");

        outcome
    }

    async fn drive<F>(
        &self,
        server: &Arc<dyn ToolServerInterface>,
        mut shutdown: Pin<&mut F>,
    ) -> Result<Completion, OrchestratorError>
    where
        F: Future<Output = ()>,
    {
        enter(Phase::Warmup);
        let ready = server.wait_ready(
            self.settings.ready_timeout,
            self.settings.ready_poll_interval,
        );
        interruptible(Phase::Warmup, ready, shutdown.as_mut())
            .await?
            .map_err(OrchestratorError::NotReady)?;

        enter(Phase::Configure);
        let agent = build_agent(&self.settings.agent, Arc::clone(server));

        enter(Phase::Invoke);
        let result = interruptible(
            Phase::Invoke,
            self.runner.run(&agent, &self.settings.prompt),
            shutdown.as_mut(),
        )
        .await?;

        enter(Phase::Report);
        Ok(report(result))
    }
}

fn report<E: fmt::Display>(result: Result<RunResult, E>) -> Completion {
    match result {
        Ok(run) => {
            info!(
                run_id = %run.run_id,
                turns = run.turns,
                tool_calls = run.steps.len(),
                "Run completed"
            );
            Completion::Success(run.final_output)
        }
        Err(err) => {
            warn!(%err, "Runner failed");
            Completion::ReportedError(format!("{RUNNER_ERROR_PREFIX} {err}"))
        }
    }
}

fn enter(phase: Phase) {
    debug!(%phase, "Entering phase");
}

async fn interruptible<T, F>(
    phase: Phase,
    work: impl Future<Output = T>,
    shutdown: Pin<&mut F>,
) -> Result<T, OrchestratorError>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        output = work => Ok(output),
        _ = shutdown => {
            warn!(%phase, "Shutdown requested");
            Err(OrchestratorError::Interrupted { phase })
        }
    }
}
