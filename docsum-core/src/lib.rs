//! Core library for `docsum`.
//!
//! Wires a tool-calling agent to an external MCP tool server: the tool
//! server is launched over stdio, an agent definition is assembled from
//! configuration, and a runner drives the model until it produces a final
//! answer.

pub mod application;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;

pub use application::{agent, orchestrator, tooling};
pub use config::{AppConfig, ConfigError};
pub use domain::types;
pub use infrastructure::model;
