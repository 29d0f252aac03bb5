use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(
    name = "docsum",
    version,
    about = "Fetch a web page through an MCP tool server and summarise it"
)]
pub struct Cli {
    /// Configuration file (defaults to config/docsum.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Environment file to load instead of searching for .env
    #[arg(long)]
    pub env_file: Option<PathBuf>,
    /// Replace the configured prompt
    #[arg(long)]
    pub prompt: Option<String>,
}
