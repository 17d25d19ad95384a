//! TokenRoute Core - chat message routing engine.
//!
//! - [`channel`]: per-channel handler triggers and resolution
//! - [`config`]: TOML configuration loading and validation
//! - [`registry`]: handler registry rebuilds and snapshot publishing
//! - [`scheduler`]: periodic registry refresh
//! - [`router`]: message dispatch against the current snapshot
//! - [`source`]: metadata source implementations

pub mod channel;
pub mod config;
pub mod registry;
pub mod router;
pub mod scheduler;
pub mod source;

#[cfg(any(test, feature = "test-utils"))]
pub mod testkit;

pub use channel::{ChannelHandler, ChannelRoute, ChannelSet, TokenRange};
pub use config::{AppConfig, ConfigError, RoutingConfig};
pub use registry::{
    HandlerRegistry, RefreshPolicy, RegistryBuilder, RegistryError, RegistryHandle,
};
pub use router::{RouteOutcome, Router, RouterError};
pub use scheduler::{RefreshOutcome, RefreshScheduler, SchedulerHandle};
