pub mod check;
pub mod refresh;
pub mod resolve;
pub mod run;

use anyhow::{Result, anyhow};
use std::sync::Arc;

use tokenroute_core::{AppConfig, RegistryBuilder, source};

use crate::handler::LoggingHandlerFactory;

/// Registry builder wired to the configured metadata source.
pub(crate) fn registry_builder(config: &AppConfig) -> Result<RegistryBuilder> {
    let settings = config
        .source
        .as_ref()
        .ok_or_else(|| anyhow!("No [source] section in configuration"))?;
    let source = source::from_settings(settings)?;
    Ok(RegistryBuilder::from_settings(
        source,
        Arc::new(LoggingHandlerFactory),
        &config.refresh,
    ))
}
