use serde::Deserialize;
use std::time::Duration;

/// Timing and loop limits for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Upper bound for spawn + `initialize` handshake
    pub handshake_timeout: Duration,
    /// Upper bound for the readiness poll after the handshake
    pub ready_timeout: Duration,
    pub ready_poll_interval: Duration,
    /// How long the tool server gets to exit after stdin is closed
    pub shutdown_grace: Duration,
    /// Model round-trips allowed before the runner gives up
    pub max_turns: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(30),
            ready_timeout: Duration::from_secs(10),
            ready_poll_interval: Duration::from_millis(250),
            shutdown_grace: Duration::from_millis(2000),
            max_turns: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct RawRuntime {
    pub(super) handshake_timeout_secs: Option<u64>,
    pub(super) ready_timeout_secs: Option<u64>,
    pub(super) ready_poll_interval_ms: Option<u64>,
    pub(super) shutdown_grace_ms: Option<u64>,
    pub(super) max_turns: Option<usize>,
}

impl From<RawRuntime> for RuntimeConfig {
    fn from(raw: RawRuntime) -> Self {
        let defaults = RuntimeConfig::default();
        Self {
            handshake_timeout: raw
                .handshake_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.handshake_timeout),
            ready_timeout: raw
                .ready_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.ready_timeout),
            ready_poll_interval: raw
                .ready_poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.ready_poll_interval),
            shutdown_grace: raw
                .shutdown_grace_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.shutdown_grace),
            max_turns: raw.max_turns.unwrap_or(defaults.max_turns),
        }
    }
}
