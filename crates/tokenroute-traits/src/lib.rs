//! TokenRoute Traits - Shared trait definitions and routing primitives.
//!
//! This crate provides the interfaces shared across the TokenRoute workspace:
//! - HandlerId, the parsed `"<project_id>-<contract>"` join key
//! - InboundMessage, the message handed to handlers
//! - Handler metadata and registry record types
//! - MetadataSource, the external lookup the registry refreshes from
//! - MessageHandler and HandlerFactory, the dispatch seam

pub mod handler;
pub mod handler_id;
pub mod message;
pub mod metadata;
pub mod source;

// ── Top-level re-exports ─────────────────────────────────────────────

pub use handler::{HandlerFactory, MessageHandler};
pub use handler_id::{HandlerId, HandlerIdError};
pub use message::InboundMessage;
pub use metadata::{ContractDescriptor, HandlerMetadata, HandlerRecord, NamedMappings};
pub use source::{MetadataSource, SourceError};
