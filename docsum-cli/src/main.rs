mod cli;

use clap::Parser;
use cli::Cli;
use docsum_core::agent::Runner;
use docsum_core::config::{AppConfig, ConfigError, load_env};
use docsum_core::model::OpenAIClient;
use docsum_core::orchestrator::{Orchestrator, OrchestratorSettings};
use docsum_core::tooling::StdioLauncher;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt};

/// Exit status for configuration failures
const EXIT_CONFIG: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();
    info!("Starting docsum");
    debug!(config = ?cli.config, env_file = ?cli.env_file, "CLI arguments parsed");

    let config = match load_configuration(&cli) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "Configuration failed");
            println!("An error occurred: {err}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let model = OpenAIClient::from_config(&config.provider);
    let runner = Runner::new(model, config.runtime.max_turns);
    let launcher = StdioLauncher::new(
        config.server.clone(),
        config.runtime.handshake_timeout,
        config.runtime.shutdown_grace,
    );
    let orchestrator = Orchestrator::new(launcher, runner, OrchestratorSettings::from(&config));

    match orchestrator.run_until(ctrl_c()).await {
        Ok(completion) => {
            println!("{completion}");
            info!(success = completion.is_success(), "Client execution finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "Run aborted");
            eprintln!("{err}");
            ExitCode::from(err.exit_code().clamp(1, 255) as u8)
        }
    }
}

/// Environment first, so the config and the model client see the credentials.
fn load_configuration(cli: &Cli) -> Result<AppConfig, ConfigError> {
    load_env(cli.env_file.as_deref())?;
    let config = AppConfig::load(cli.config.as_deref())?;
    match &cli.prompt {
        Some(prompt) if prompt.trim().is_empty() => Err(ConfigError::EmptyField { field: "prompt" }),
        Some(prompt) => Ok(config.with_prompt(prompt.clone())),
        None => Ok(config),
    }
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "Failed to listen for Ctrl-C; interruption disabled");
        std::future::pending::<()>().await;
    }
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
