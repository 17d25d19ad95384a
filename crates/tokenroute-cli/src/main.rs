mod cli;
mod commands;
mod handler;
mod logging;
mod output;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use cli::{Cli, Commands};
use tokenroute_core::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => AppConfig::default_path()
            .ok_or_else(|| anyhow!("Could not determine the config directory; pass --config"))?,
    };
    let config = AppConfig::load_from_path(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let _guard = logging::init(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Check => commands::check::run(&config, cli.format),
        Commands::Resolve(args) => commands::resolve::run(&config, args, cli.format),
        Commands::Refresh => commands::refresh::run(config, cli.format).await,
        Commands::Run(args) => commands::run::run(config, args).await,
    }
}
