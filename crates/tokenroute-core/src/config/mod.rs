//! Configuration file support
//!
//! Loads the routing configuration from `~/.config/tokenroute/config.toml`
//! (or an explicit path). A file looks like:
//!
//! ```toml
//! [refresh]
//! interval_minutes = 60
//!
//! [source]
//! kind = "http"
//! base_url = "https://metadata.example.com"
//!
//! [channels."1001"]
//! name = "sales"
//!
//! [channels."1001".handler]
//! default = "23-ogcontract"
//! string_triggers = { "24" = ["sweep"] }
//! token_id_triggers = [{ "25-pass" = [100, 200] }]
//!
//! [handlers."23-ogcontract".named_mappings]
//! sets = "Bundles"
//!
//! [contracts.ogcontract]
//! address = "0x1234"
//! ```
//!
//! Channel, string trigger and range trigger order is taken from the file;
//! it decides trigger precedence.

mod ordered;

pub use ordered::Ordered;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use tokenroute_traits::{ContractDescriptor, HandlerId, NamedMappings};

use crate::channel::{ChannelHandler, ChannelRoute, ChannelSet, StringTrigger, TokenRange};
use crate::registry::RefreshPolicy;

/// Default refresh interval
pub const DEFAULT_REFRESH_INTERVAL_MINUTES: u64 = 60;

/// Default per-fetch timeout
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Channel '{channel}' has a handler table but no default handler")]
    MissingDefaultHandler { channel: String },

    #[error("Channel '{channel}' has an empty trigger for handler {handler}")]
    EmptyTrigger { channel: String, handler: HandlerId },

    #[error("Channel '{channel}' has an invalid range [{low}, {high}] for handler {handler}")]
    InvalidRange {
        channel: String,
        handler: HandlerId,
        low: u64,
        high: u64,
    },

    #[error("Channel name '{0}' is used by more than one channel")]
    DuplicateChannelName(String),

    #[error("Refresh interval must be at least one minute")]
    InvalidRefreshInterval,
}

/// Refresh scheduling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    /// Minutes between registry rebuilds
    pub interval_minutes: u64,
    /// Per-fetch timeout in seconds (0 disables the timeout)
    pub fetch_timeout_secs: u64,
    /// How a rebuild with failed fetches is published
    pub policy: RefreshPolicy,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_REFRESH_INTERVAL_MINUTES,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            policy: RefreshPolicy::default(),
        }
    }
}

impl RefreshSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        (self.fetch_timeout_secs > 0).then(|| Duration::from_secs(self.fetch_timeout_secs))
    }
}

/// Metadata source selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSettings {
    /// Remote metadata API
    Http {
        base_url: String,
        /// Environment variable holding the bearer token
        #[serde(default)]
        api_key_env: Option<String>,
        /// Request timeout in seconds
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    /// Metadata fixture file, resolved relative to the config file
    Static { path: PathBuf },
}

/// Logging settings consumed by the binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Directory for daily rolling log files
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default)]
    pub level: Option<String>,
}

/// Per-handler configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerSettings {
    #[serde(default)]
    pub named_mappings: NamedMappings,
}

/// Everything the router and registry read: channels, handlers, contracts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingConfig {
    pub channels: ChannelSet,
    pub handlers: HashMap<HandlerId, HandlerSettings>,
    pub contracts: HashMap<String, ContractDescriptor>,
}

impl RoutingConfig {
    pub fn new(channels: ChannelSet) -> Self {
        Self {
            channels,
            ..Self::default()
        }
    }

    /// Add handler settings
    pub fn with_handler(mut self, id: HandlerId, settings: HandlerSettings) -> Self {
        self.handlers.insert(id, settings);
        self
    }

    /// Add a contract descriptor, keyed by its name
    pub fn with_contract(mut self, descriptor: ContractDescriptor) -> Self {
        self.contracts.insert(descriptor.name.clone(), descriptor);
        self
    }

    pub fn named_mappings(&self, id: &HandlerId) -> NamedMappings {
        self.handlers
            .get(id)
            .map(|settings| settings.named_mappings.clone())
            .unwrap_or_default()
    }

    pub fn contract(&self, name: &str) -> Option<&ContractDescriptor> {
        self.contracts.get(name)
    }
}

/// Fully loaded and validated configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    pub refresh: RefreshSettings,
    pub source: Option<SourceSettings>,
    pub logging: LoggingSettings,
    pub routing: RoutingConfig,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    refresh: RefreshSettings,
    #[serde(default)]
    source: Option<SourceSettings>,
    #[serde(default)]
    logging: LoggingSettings,
    #[serde(default)]
    channels: Ordered<String, RawChannel>,
    #[serde(default)]
    handlers: HashMap<HandlerId, HandlerSettings>,
    #[serde(default)]
    contracts: HashMap<String, ContractDescriptor>,
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    name: String,
    #[serde(default)]
    handler: Option<RawChannelHandler>,
}

#[derive(Debug, Deserialize)]
struct RawChannelHandler {
    #[serde(default)]
    default: Option<HandlerId>,
    #[serde(default)]
    string_triggers: Ordered<HandlerId, Vec<String>>,
    #[serde(default)]
    token_id_triggers: Vec<Ordered<HandlerId, TokenRange>>,
}

impl AppConfig {
    /// Get the default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tokenroute").join("config.toml"))
    }

    /// Load and validate configuration from a file
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path.parent())
    }

    /// Parse and validate configuration text.
    ///
    /// Relative paths in the file are resolved against `base_dir`.
    pub fn from_toml_str(content: &str, base_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;
        Self::from_raw(raw, base_dir)
    }

    fn from_raw(raw: RawConfig, base_dir: Option<&Path>) -> Result<Self, ConfigError> {
        if raw.refresh.interval_minutes == 0 {
            return Err(ConfigError::InvalidRefreshInterval);
        }

        let mut names = HashSet::new();
        let mut channels = ChannelSet::new();
        for (channel_id, channel) in raw.channels.into_inner() {
            if !names.insert(channel.name.clone()) {
                return Err(ConfigError::DuplicateChannelName(channel.name));
            }
            let handler = channel
                .handler
                .map(|handler| build_channel_handler(&channel.name, handler))
                .transpose()?;
            channels.insert(ChannelRoute {
                id: channel_id,
                name: channel.name,
                handler,
            });
        }

        let contracts = raw
            .contracts
            .into_iter()
            .map(|(name, mut descriptor)| {
                if descriptor.name.is_empty() {
                    descriptor.name = name.clone();
                }
                (name, descriptor)
            })
            .collect();

        let source = raw.source.map(|source| match (source, base_dir) {
            (SourceSettings::Static { path }, Some(base)) if path.is_relative() => {
                SourceSettings::Static {
                    path: base.join(path),
                }
            }
            (source, _) => source,
        });

        Ok(Self {
            refresh: raw.refresh,
            source,
            logging: raw.logging,
            routing: RoutingConfig {
                channels,
                handlers: raw.handlers,
                contracts,
            },
        })
    }
}

fn build_channel_handler(
    channel: &str,
    raw: RawChannelHandler,
) -> Result<ChannelHandler, ConfigError> {
    let default = raw.default.ok_or_else(|| ConfigError::MissingDefaultHandler {
        channel: channel.to_string(),
    })?;

    let mut string_triggers = Vec::new();
    for (handler, patterns) in raw.string_triggers.into_inner() {
        if patterns.iter().any(|p| p.is_empty()) {
            return Err(ConfigError::EmptyTrigger {
                channel: channel.to_string(),
                handler,
            });
        }
        string_triggers.push(StringTrigger::new(handler, patterns));
    }

    let mut token_id_triggers = Vec::new();
    for group in raw.token_id_triggers {
        let group = group.into_inner();
        for (handler, range) in &group {
            if range.low > range.high {
                return Err(ConfigError::InvalidRange {
                    channel: channel.to_string(),
                    handler: handler.clone(),
                    low: range.low,
                    high: range.high,
                });
            }
        }
        token_id_triggers.push(group);
    }

    Ok(ChannelHandler {
        default,
        string_triggers,
        token_id_triggers,
    })
}
