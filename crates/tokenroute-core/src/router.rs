//! Message routing.
//!
//! The router resolves an inbound message to a handler id using the channel's
//! triggers, then dispatches it to that handler's instance in the current
//! registry snapshot. Routing never waits for a refresh in progress.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use tokenroute_traits::{HandlerId, InboundMessage};

use crate::config::RoutingConfig;
use crate::registry::RegistryHandle;

/// What happened to a routed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Dispatched { handler: HandlerId },
    /// The channel has no handler for this message; it was dropped
    Unrouted,
}

/// Errors raised while routing a message
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error(
        "Handler {handler} resolved in channel {channel} is missing from registry generation {generation}"
    )]
    RegistryDrift {
        channel: String,
        handler: HandlerId,
        generation: u64,
    },

    #[error("Handler {handler} failed on message {message_id}: {source}")]
    Handler {
        handler: HandlerId,
        message_id: String,
        #[source]
        source: anyhow::Error,
    },
}

impl RouterError {
    /// Whether the error indicates broken configuration rather than a bad message.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RouterError::UnknownChannel(_) | RouterError::RegistryDrift { .. }
        )
    }
}

/// Routes inbound messages to registered handlers.
#[derive(Debug, Clone)]
pub struct Router {
    config: Arc<RoutingConfig>,
    registry: RegistryHandle,
}

impl Router {
    pub fn new(config: Arc<RoutingConfig>, registry: RegistryHandle) -> Self {
        Self { config, registry }
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    /// Resolve the handler for `text` posted in `channel_id`, without dispatching.
    pub fn resolve(&self, channel_id: &str, text: &str) -> Result<Option<HandlerId>, RouterError> {
        self.resolve_normalized(channel_id, &text.to_lowercase())
    }

    fn resolve_normalized(
        &self,
        channel_id: &str,
        lowercased_text: &str,
    ) -> Result<Option<HandlerId>, RouterError> {
        let channel = self
            .config
            .channels
            .get(channel_id)
            .ok_or_else(|| RouterError::UnknownChannel(channel_id.to_string()))?;
        Ok(channel.resolve_handler(lowercased_text).cloned())
    }

    /// Route a message to its handler.
    pub async fn route(&self, message: &InboundMessage) -> Result<RouteOutcome, RouterError> {
        let Some(handler_id) =
            self.resolve_normalized(&message.channel_id, &message.normalized_content())?
        else {
            error!(
                "Channel {} does not have a handler for message {}",
                message.channel_id, message.id
            );
            return Ok(RouteOutcome::Unrouted);
        };

        let snapshot = self.registry.load();
        let Some(registered) = snapshot.get(&handler_id) else {
            error!(
                "Handler {} for channel {} not found in registry generation {}",
                handler_id,
                message.channel_id,
                snapshot.generation()
            );
            return Err(RouterError::RegistryDrift {
                channel: message.channel_id.clone(),
                handler: handler_id,
                generation: snapshot.generation(),
            });
        };
        let instance = registered.instance.clone();
        drop(snapshot);

        debug!(
            "Dispatching message {} from channel {} to handler {}",
            message.id, message.channel_id, handler_id
        );
        instance
            .handle_message(message)
            .await
            .map_err(|source| RouterError::Handler {
                handler: handler_id.clone(),
                message_id: message.id.clone(),
                source,
            })?;

        Ok(RouteOutcome::Dispatched {
            handler: handler_id,
        })
    }
}
