//! Refresh Scheduler - keeps the handler registry current.
//!
//! The scheduler rebuilds the registry once on start, then again on every
//! interval tick or manual request. Rebuilds never overlap: a request that
//! arrives while one is running is skipped.

use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use crate::config::RoutingConfig;
use crate::registry::{RegistryBuilder, RegistryError, RegistryHandle};

/// Result of a single refresh attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot was published
    Published {
        generation: u64,
        handlers: usize,
        /// Handlers whose fetch failed and whose previous record was kept
        carried_over: usize,
    },
    /// The rebuild was abandoned; the previous snapshot stays published
    Failed { failed: usize, total: usize },
    /// Another rebuild was already running
    Skipped,
}

impl RefreshOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, RefreshOutcome::Published { .. })
    }
}

/// Message types for controlling the scheduler
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Refresh immediately and report the outcome
    RefreshNow(oneshot::Sender<RefreshOutcome>),
    /// Stop the scheduler
    Stop,
}

/// Handle to control a running RefreshScheduler
#[derive(Clone)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    initial: RefreshOutcome,
}

impl SchedulerHandle {
    /// Outcome of the refresh performed on start
    pub fn initial_outcome(&self) -> &RefreshOutcome {
        &self.initial
    }

    /// Trigger a refresh and wait for it to finish
    pub async fn refresh_now(&self) -> Result<RefreshOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(SchedulerCommand::RefreshNow(reply_tx))
            .await
            .map_err(|e| anyhow!("Failed to send refresh command: {}", e))?;
        reply_rx
            .await
            .map_err(|e| anyhow!("Refresh was dropped before completing: {}", e))
    }

    /// Stop the scheduler. A rebuild already running is left to finish.
    pub async fn stop(&self) -> Result<()> {
        self.command_tx
            .send(SchedulerCommand::Stop)
            .await
            .map_err(|e| anyhow!("Failed to send stop command: {}", e))
    }
}

/// Periodically rebuilds the handler registry and publishes the result.
pub struct RefreshScheduler {
    builder: RegistryBuilder,
    config: Arc<RoutingConfig>,
    registry: RegistryHandle,
    interval: Duration,
    refreshing: AtomicBool,
}

impl RefreshScheduler {
    pub fn new(
        builder: RegistryBuilder,
        config: Arc<RoutingConfig>,
        registry: RegistryHandle,
        interval: Duration,
    ) -> Self {
        Self {
            builder,
            config,
            registry,
            interval,
            refreshing: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    /// Rebuild the registry once and publish it on success.
    pub async fn refresh_once(&self) -> RefreshOutcome {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Registry refresh already in progress, skipping");
            return RefreshOutcome::Skipped;
        }
        let _guard = scopeguard::guard((), |_| {
            self.refreshing.store(false, Ordering::SeqCst);
        });

        let previous = self.registry.load();
        match self.builder.rebuild(&self.config, &previous).await {
            Ok(report) => {
                let generation = report.registry.generation();
                let handlers = report.registry.len();
                let carried_over = report.carried_over.len();
                self.registry.publish(report.registry);
                info!(
                    "Published handler registry generation {} ({} handlers, {} carried over)",
                    generation, handlers, carried_over
                );
                RefreshOutcome::Published {
                    generation,
                    handlers,
                    carried_over,
                }
            }
            Err(RegistryError::FetchFailed { total, failures }) => {
                error!(
                    "Registry refresh failed ({} of {} fetches), keeping generation {}",
                    failures.len(),
                    total,
                    previous.generation()
                );
                RefreshOutcome::Failed {
                    failed: failures.len(),
                    total,
                }
            }
        }
    }

    /// Run the initial refresh, then start the periodic loop.
    ///
    /// Returns once the initial refresh has finished, whether or not it
    /// succeeded.
    pub async fn start(self: Arc<Self>) -> SchedulerHandle {
        let initial = self.refresh_once().await;
        if !initial.is_published() {
            warn!("Initial registry refresh did not publish: {:?}", initial);
        }

        let (command_tx, command_rx) = mpsc::channel(16);
        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler.run_loop(command_rx).await;
        });

        SchedulerHandle {
            command_tx,
            initial,
        }
    }

    async fn run_loop(self: Arc<Self>, mut command_rx: mpsc::Receiver<SchedulerCommand>) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "RefreshScheduler started (interval={}s)",
            self.interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    debug!("Scheduled registry refresh");
                    let scheduler = self.clone();
                    tokio::spawn(async move {
                        scheduler.refresh_once().await;
                    });
                }
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(SchedulerCommand::RefreshNow(reply_tx)) => {
                            debug!("Manual registry refresh triggered");
                            let scheduler = self.clone();
                            tokio::spawn(async move {
                                let outcome = scheduler.refresh_once().await;
                                let _ = reply_tx.send(outcome);
                            });
                        }
                        Some(SchedulerCommand::Stop) => {
                            info!("RefreshScheduler stopping...");
                            break;
                        }
                        None => {
                            info!("Command channel closed, stopping scheduler");
                            break;
                        }
                    }
                }
            }
        }

        info!("RefreshScheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelHandler, ChannelRoute, ChannelSet};
    use crate::testkit::{MockMetadataSource, RecordingHandlerFactory, metadata};
    use tokenroute_traits::{HandlerId, SourceError};

    const HOUR: Duration = Duration::from_secs(3600);

    fn id(raw: &str) -> HandlerId {
        raw.parse().unwrap()
    }

    fn config() -> Arc<RoutingConfig> {
        let channels: ChannelSet = [ChannelRoute::routed(
            "c-1",
            "sales",
            ChannelHandler::new(id("1")).with_string_trigger(id("2"), ["sale"]),
        )]
        .into_iter()
        .collect();
        Arc::new(RoutingConfig::new(channels))
    }

    fn healthy_source() -> Arc<MockMetadataSource> {
        let source = MockMetadataSource::new();
        source.set(id("1"), metadata("Default", 1));
        source.set(id("2"), metadata("Sales", 2));
        Arc::new(source)
    }

    fn scheduler(source: Arc<MockMetadataSource>) -> Arc<RefreshScheduler> {
        let builder = RegistryBuilder::new(source, Arc::new(RecordingHandlerFactory::new()));
        Arc::new(RefreshScheduler::new(
            builder,
            config(),
            RegistryHandle::new(),
            HOUR,
        ))
    }

    #[tokio::test]
    async fn test_start_publishes_before_returning() {
        let scheduler = scheduler(healthy_source());
        let handle = scheduler.clone().start().await;

        assert_eq!(
            handle.initial_outcome(),
            &RefreshOutcome::Published {
                generation: 1,
                handlers: 2,
                carried_over: 0
            }
        );
        assert_eq!(scheduler.registry().generation(), 1);
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_initial_refresh_leaves_empty_registry() {
        let source = healthy_source();
        source.fail(id("2"), SourceError::Http("500".to_string()));
        let scheduler = scheduler(source);

        let handle = scheduler.clone().start().await;
        assert_eq!(
            handle.initial_outcome(),
            &RefreshOutcome::Failed { failed: 1, total: 2 }
        );
        assert!(scheduler.registry().load().is_empty());
        assert_eq!(scheduler.registry().generation(), 0);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let source = healthy_source();
        let scheduler = scheduler(source.clone());
        let handle = scheduler.clone().start().await;
        let before = scheduler.registry().load();

        source.fail(id("1"), SourceError::NotFound(1));
        let outcome = handle.refresh_now().await.unwrap();

        assert_eq!(outcome, RefreshOutcome::Failed { failed: 1, total: 2 });
        let after = scheduler.registry().load();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(*before, *after);
    }

    #[tokio::test]
    async fn test_refresh_now_publishes_next_generation() {
        let source = healthy_source();
        let scheduler = scheduler(source.clone());
        let handle = scheduler.clone().start().await;

        source.set(id("2"), metadata("Sales", 7));
        let outcome = handle.refresh_now().await.unwrap();

        assert!(matches!(outcome, RefreshOutcome::Published { generation: 2, .. }));
        let registry = scheduler.registry().load();
        assert_eq!(registry.get(&id("2")).unwrap().record.invocation_count, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_refresh_is_skipped() {
        let source = healthy_source();
        source.delay(id("1"), Duration::from_secs(10));
        let scheduler = scheduler(source.clone());

        let (first, second) = tokio::join!(scheduler.refresh_once(), scheduler.refresh_once());

        assert!(first.is_published());
        assert_eq!(second, RefreshOutcome::Skipped);
        assert_eq!(source.calls_for(1), 1);
        assert!(!scheduler.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_tick_triggers_refresh() {
        let scheduler = scheduler(healthy_source());
        let handle = scheduler.clone().start().await;
        assert_eq!(scheduler.registry().generation(), 1);

        tokio::time::sleep(HOUR - Duration::from_secs(1)).await;
        assert_eq!(scheduler.registry().generation(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(scheduler.registry().generation(), 2);

        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_commands_fail_after_stop() {
        let scheduler = scheduler(healthy_source());
        let handle = scheduler.start().await;
        handle.stop().await.unwrap();

        // Give the loop a chance to exit and drop its receiver.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(handle.refresh_now().await.is_err());
    }
}
