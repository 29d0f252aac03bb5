//! # Agent Module
//!
//! An agent is a declarative bundle of name, model, instructions and tools.
//! A runner takes an agent plus a prompt and drives the model until it stops
//! asking for tools.
//!
//! ## Key Types
//!
//! - [`AgentDefinition`] - immutable agent configuration
//! - [`AgentRunner`] - the `run(agent, prompt)` seam
//! - [`Runner`] - multi-turn tool-calling loop over a [`ModelClient`](crate::model::ModelClient)
//! - [`RunResult`] - final output plus the tool steps taken
//!
//! ## Agent Loop
//!
//! 1. Send the conversation and tool schemas to the model
//! 2. If the model requests tool calls, execute them in order and append the results
//! 3. Otherwise the assistant message is the final output

mod definition;
mod errors;
mod models;
mod runner;

pub use definition::{AgentDefinition, ToolRef, build_agent};
pub use errors::{AgentError, ToolError};
pub use models::{AgentStep, RunResult};
pub use runner::{AgentRunner, Runner};
