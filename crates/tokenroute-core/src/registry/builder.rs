//! Registry rebuild: collect referenced handlers, fetch their metadata
//! concurrently, and assemble a new snapshot.

use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use tokenroute_traits::{
    HandlerFactory, HandlerId, HandlerRecord, MetadataSource, SourceError,
};

use super::snapshot::{HandlerRegistry, RegisteredHandler};
use super::{FetchFailure, RefreshPolicy, RegistryError};
use crate::channel::ChannelSet;
use crate::config::{RefreshSettings, RoutingConfig};

/// Handler ids referenced by the channels, and the channel that owns each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerReferences {
    /// Deduplicated ids in first-seen order
    pub handlers: Vec<HandlerId>,
    /// Last declaring channel per handler id
    pub channel_of_handler: HashMap<HandlerId, String>,
}

/// Scan every channel's default, string trigger keys and range trigger keys.
pub fn collect_handler_references(channels: &ChannelSet) -> HandlerReferences {
    let mut seen = HashSet::new();
    let mut references = HandlerReferences::default();

    for channel in channels.iter() {
        let Some(handler) = &channel.handler else {
            continue;
        };
        for id in handler.referenced_handlers() {
            if seen.insert(id.clone()) {
                references.handlers.push(id.clone());
            }
            references
                .channel_of_handler
                .insert(id.clone(), channel.id.clone());
        }
    }

    references
}

/// Result of a rebuild that produced a publishable registry.
#[derive(Debug)]
pub struct RebuildReport {
    pub registry: HandlerRegistry,
    /// Failed fetches whose previous records were carried over (partial policy only)
    pub carried_over: Vec<FetchFailure>,
}

/// Builds registry snapshots from a metadata source.
pub struct RegistryBuilder {
    source: Arc<dyn MetadataSource>,
    factory: Arc<dyn HandlerFactory>,
    fetch_timeout: Option<Duration>,
    policy: RefreshPolicy,
}

impl RegistryBuilder {
    /// Create a builder with no fetch timeout and the all-or-nothing policy
    pub fn new(source: Arc<dyn MetadataSource>, factory: Arc<dyn HandlerFactory>) -> Self {
        Self {
            source,
            factory,
            fetch_timeout: None,
            policy: RefreshPolicy::default(),
        }
    }

    /// Create a builder using the timeout and policy from `[refresh]`
    pub fn from_settings(
        source: Arc<dyn MetadataSource>,
        factory: Arc<dyn HandlerFactory>,
        settings: &RefreshSettings,
    ) -> Self {
        Self::new(source, factory)
            .with_fetch_timeout(settings.fetch_timeout())
            .with_policy(settings.policy)
    }

    /// Bound every metadata fetch; `None` waits indefinitely.
    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// Build a new registry for `config`.
    ///
    /// `previous` provides the generation counter and, under the partial
    /// policy, the records kept for handlers whose fetch failed.
    pub async fn rebuild(
        &self,
        config: &RoutingConfig,
        previous: &HandlerRegistry,
    ) -> Result<RebuildReport, RegistryError> {
        let references = collect_handler_references(&config.channels);
        let total = references.handlers.len();
        info!(
            "Rebuilding handler registry ({} handlers, source={}, policy={:?})",
            total,
            self.source.name(),
            self.policy
        );

        let fetches = references
            .handlers
            .iter()
            .map(|id| async move { (id, self.fetch_handler(id, config).await) });
        let results = join_all(fetches).await;

        let mut handlers = HashMap::with_capacity(total);
        let mut failures = Vec::new();
        for (id, result) in results {
            match result {
                Ok(handler) => {
                    handlers.insert(id.clone(), handler);
                }
                Err(error) => {
                    error!("Failed to fetch metadata for handler {}: {}", id, error);
                    failures.push(FetchFailure {
                        handler: id.clone(),
                        error,
                    });
                }
            }
        }

        if !failures.is_empty() {
            match self.policy {
                RefreshPolicy::AllOrNothing => {
                    return Err(RegistryError::FetchFailed { total, failures });
                }
                RefreshPolicy::Partial => {
                    let unregistered = failures
                        .iter()
                        .filter(|failure| !previous.contains(&failure.handler))
                        .count();
                    if unregistered > 0 {
                        warn!(
                            "{} failed handlers have no previous metadata, abandoning partial rebuild",
                            unregistered
                        );
                        return Err(RegistryError::FetchFailed { total, failures });
                    }
                    for failure in &failures {
                        if let Some(kept) = previous.get(&failure.handler) {
                            warn!(
                                "Keeping previous metadata for handler {} after failed fetch",
                                failure.handler
                            );
                            handlers.insert(failure.handler.clone(), kept.clone());
                        }
                    }
                }
            }
        }

        let registry = HandlerRegistry::new(
            handlers,
            references.channel_of_handler,
            previous.generation() + 1,
        );
        Ok(RebuildReport {
            registry,
            carried_over: failures,
        })
    }

    async fn fetch_handler(
        &self,
        id: &HandlerId,
        config: &RoutingConfig,
    ) -> Result<RegisteredHandler, SourceError> {
        let descriptor = match id.contract() {
            Some(name) => {
                let descriptor = config.contract(name);
                if descriptor.is_none() {
                    warn!(
                        "No contract descriptor named '{}' for handler {}, fetching without one",
                        name, id
                    );
                }
                descriptor
            }
            None => None,
        };

        debug!("Fetching metadata for handler {}", id);
        let fetch = self
            .source
            .fetch_handler_metadata(id.project_id, descriptor);
        let metadata = match self.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .map_err(|_| SourceError::Timeout(limit))??,
            None => fetch.await?,
        };

        let record = HandlerRecord::from_metadata(id.clone(), metadata, config.named_mappings(id));
        let instance = self.factory.create(&record);
        Ok(RegisteredHandler::new(record, instance))
    }
}
