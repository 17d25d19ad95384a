//! Metadata source abstraction.
//!
//! The registry asks a [`MetadataSource`] for the current state of every
//! handler referenced by channel configuration. Sources are injected, so
//! tests and offline runs can swap the network lookup for a fixture.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::metadata::{ContractDescriptor, HandlerMetadata};

/// Errors that can occur when fetching handler metadata
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Project not found: {0}")]
    NotFound(u64),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// External lookup of handler metadata
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Get the source name (for logging)
    fn name(&self) -> &str;

    /// Fetch the current metadata for a project, optionally scoped to a contract.
    async fn fetch_handler_metadata(
        &self,
        project_id: u64,
        contract: Option<&ContractDescriptor>,
    ) -> Result<HandlerMetadata, SourceError>;
}
