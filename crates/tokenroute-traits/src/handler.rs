//! Handler interfaces.
//!
//! What a handler does with a routed message is its own business; the router
//! only needs something it can hand the original message to.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::message::InboundMessage;
use crate::metadata::HandlerRecord;

/// Receives messages the router resolved to this handler.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Act on a routed message.
    async fn handle_message(&self, message: &InboundMessage) -> Result<()>;
}

/// Creates handler instances for freshly fetched registry records.
///
/// Called once per handler on every registry rebuild; the returned instance
/// lives as long as the snapshot that holds it.
pub trait HandlerFactory: Send + Sync {
    fn create(&self, record: &HandlerRecord) -> Arc<dyn MessageHandler>;
}
