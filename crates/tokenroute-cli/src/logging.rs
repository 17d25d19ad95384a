use anyhow::{Context, Result};
use tokenroute_core::config::LoggingSettings;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "tokenroute.log";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. With `logging.directory` set,
/// output goes to a daily rolling file and the returned guard must be held
/// until exit so buffered lines are flushed.
pub fn init(settings: &LoggingSettings, verbose: bool) -> Result<Option<WorkerGuard>> {
    let default_level = if verbose {
        "debug".to_string()
    } else {
        settings.level.clone().unwrap_or_else(|| "info".to_string())
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&default_level))
        .with_context(|| format!("Invalid log level '{}'", default_level))?;

    match &settings.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .with_level(true)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
            Ok(None)
        }
    }
}
