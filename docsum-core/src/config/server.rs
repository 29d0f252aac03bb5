use crate::constants::{DEFAULT_SERVER_ARGS, DEFAULT_SERVER_COMMAND, DEFAULT_SERVER_NAME};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Launch parameters for a stdio MCP tool server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub name: String,
    pub command: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub workdir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVER_NAME.to_string(),
            command: PathBuf::from(DEFAULT_SERVER_COMMAND),
            args: DEFAULT_SERVER_ARGS.iter().map(|s| s.to_string()).collect(),
            env: HashMap::new(),
            workdir: None,
        }
    }
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, command: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args,
            env: HashMap::new(),
            workdir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawServer {
    pub(crate) name: Option<String>,
    pub(crate) command: Option<String>,
    pub(crate) args: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) env: HashMap<String, String>,
    pub(crate) workdir: Option<String>,
}

impl From<RawServer> for ServerConfig {
    fn from(raw: RawServer) -> Self {
        let expand = |s: &str| -> String {
            shellexpand::full(s)
                .map(|cow| cow.into_owned())
                .unwrap_or_else(|_| s.to_string())
        };

        let defaults = ServerConfig::default();

        let command = raw
            .command
            .map(|c| PathBuf::from(expand(&c)))
            .unwrap_or(defaults.command);
        let args = match raw.args {
            Some(args) => args.iter().map(|arg| expand(arg)).collect(),
            None => defaults.args,
        };
        let workdir = raw.workdir.map(|d| PathBuf::from(expand(&d)));

        Self {
            name: raw.name.unwrap_or(defaults.name),
            command,
            args,
            env: raw.env,
            workdir,
        }
    }
}
