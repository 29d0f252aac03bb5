use serde_json::Value;
use uuid::Uuid;

/// One tool call made during a run.
#[derive(Debug, Clone)]
pub struct AgentStep {
    pub tool: String,
    pub arguments: Value,
    pub success: bool,
    pub output: String,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_id: Uuid,
    pub agent: String,
    pub final_output: String,
    pub steps: Vec<AgentStep>,
    /// Model round-trips used, including the final one
    pub turns: usize,
}
