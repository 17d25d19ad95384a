use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use tokenroute_traits::{HandlerFactory, HandlerRecord, InboundMessage, MessageHandler};

/// Handler that logs every message it receives.
pub struct LoggingHandler {
    record: HandlerRecord,
}

#[async_trait]
impl MessageHandler for LoggingHandler {
    async fn handle_message(&self, message: &InboundMessage) -> Result<()> {
        info!(
            handler = %self.record.id,
            channel = %message.channel_id,
            message_id = %message.id,
            "{} ({} invocations) <- {}",
            self.record.name,
            self.record.invocation_count,
            message.content
        );
        println!("{}\t{}\t{}", message.channel_id, self.record.id, message.content);
        Ok(())
    }
}

pub struct LoggingHandlerFactory;

impl HandlerFactory for LoggingHandlerFactory {
    fn create(&self, record: &HandlerRecord) -> Arc<dyn MessageHandler> {
        Arc::new(LoggingHandler {
            record: record.clone(),
        })
    }
}
