//! Handler Registry
//!
//! The registry maps every handler id referenced by channel configuration to
//! its fetched metadata and handler instance. It is rebuilt wholesale from
//! the metadata source and published as an immutable snapshot:
//!
//! ```text
//! ChannelSet ──collect──▶ {handler ids} ──join_all──▶ MetadataSource
//!                                                         │
//!           RegistryHandle ◀──publish── HandlerRegistry ◀─┘
//!                 │
//!                 ▼
//!              Router (reads latest snapshot)
//! ```

mod builder;
mod snapshot;

pub use builder::{HandlerReferences, RebuildReport, RegistryBuilder, collect_handler_references};
pub use snapshot::{HandlerRegistry, RegisteredHandler, RegistryHandle};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tokenroute_traits::{HandlerId, SourceError};

/// How a rebuild with failed fetches is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Any failed fetch abandons the rebuild; the previous snapshot stays.
    #[default]
    AllOrNothing,
    /// Successful fetches are published; failed handlers keep their
    /// previous record when one exists.
    Partial,
}

/// A single handler whose metadata could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub handler: HandlerId,
    pub error: SourceError,
}

/// Errors raised by a registry rebuild
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("{failed} of {total} handler metadata fetches failed", failed = .failures.len())]
    FetchFailed {
        total: usize,
        failures: Vec<FetchFailure>,
    },
}
