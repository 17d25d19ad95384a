use anyhow::{Result, bail};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use tokenroute_core::{AppConfig, RefreshScheduler, RegistryHandle, RouteOutcome, Router};
use tokenroute_traits::InboundMessage;

use crate::cli::RunArgs;

use super::registry_builder;

const STDIN_SENDER: &str = "stdin";

pub async fn run(config: AppConfig, args: RunArgs) -> Result<()> {
    let interval = match args.interval_minutes {
        Some(0) => bail!("--interval-minutes must be at least 1"),
        Some(minutes) => Duration::from_secs(minutes.saturating_mul(60)),
        None => config.refresh.interval(),
    };

    let builder = registry_builder(&config)?;
    let routing = Arc::new(config.routing);
    let registry = RegistryHandle::new();
    let scheduler = Arc::new(RefreshScheduler::new(
        builder,
        routing.clone(),
        registry.clone(),
        interval,
    ));

    let handle = scheduler.start().await;
    info!(
        "Router ready (registry generation {}, {} handlers)",
        registry.generation(),
        registry.load().len()
    );
    let router = Router::new(routing, registry);

    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let result = route_lines(&router, BufReader::new(tokio::io::stdin()), interrupted).await;
    if let Err(e) = handle.stop().await {
        warn!("Failed to stop refresh scheduler: {}", e);
    }
    result
}

/// Route `<channel_id> <text>` lines until EOF, `shutdown` or a fatal error.
///
/// `shutdown` is polled across iterations, so a signal that fires while a
/// message is being routed stops the loop before the next line.
async fn route_lines<R, S>(router: &Router, input: R, shutdown: S) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Interrupted, shutting down");
                return Ok(());
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            info!("End of input, shutting down");
            return Ok(());
        };

        let Some(message) = parse_line(&line) else {
            if !line.trim().is_empty() {
                warn!("Ignoring malformed line (expected '<channel_id> <text>'): {}", line);
            }
            continue;
        };

        match router.route(&message).await {
            Ok(RouteOutcome::Dispatched { handler }) => {
                debug!("Message {} dispatched to {}", message.id, handler);
            }
            Ok(RouteOutcome::Unrouted) => {}
            Err(e) if e.is_fatal() => {
                error!("Fatal routing error: {}", e);
                return Err(e.into());
            }
            Err(e) => warn!("{}", e),
        }
    }
}

/// Parse `<channel_id> <text>` into a message.
fn parse_line(line: &str) -> Option<InboundMessage> {
    let (channel, text) = line.trim().split_once(char::is_whitespace)?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(InboundMessage::new(
        uuid::Uuid::new_v4().to_string(),
        channel,
        STDIN_SENDER,
        text,
    ))
}
