use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for CLI commands
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

#[derive(Parser)]
#[command(name = "tokenroute")]
#[command(version, about = "TokenRoute - Chat message routing engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (defaults to ~/.config/tokenroute/config.toml)
    #[arg(short, long, global = true, env = "TOKENROUTE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the configuration and list channels and handlers
    Check,

    /// Show which handler a message would be routed to
    Resolve(ResolveArgs),

    /// Rebuild the handler registry once and print it
    Refresh,

    /// Route messages read from stdin as `<channel_id> <text>` lines
    Run(RunArgs),
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Channel id
    pub channel: String,

    /// Message text
    #[arg(required = true)]
    pub text: Vec<String>,
}

#[derive(Args)]
pub struct RunArgs {
    /// Override the refresh interval in minutes
    #[arg(long)]
    pub interval_minutes: Option<u64>,
}
