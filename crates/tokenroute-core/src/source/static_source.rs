//! Metadata served from a local TOML file.
//!
//! ```toml
//! ["23-ogcontract"]
//! name = "OG Collection"
//! invocations = 12
//! active = true
//! ```

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::info;

use tokenroute_traits::{ContractDescriptor, HandlerId, HandlerMetadata, MetadataSource, SourceError};

use crate::config::ConfigError;

/// Fixed metadata keyed by handler id.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadataSource {
    entries: BTreeMap<HandlerId, HandlerMetadata>,
}

impl StaticMetadataSource {
    pub fn new(entries: HashMap<HandlerId, HandlerMetadata>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Load entries from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: HashMap<HandlerId, HandlerMetadata> = toml::from_str(&content)?;
        info!(
            "Loaded {} static handler metadata entries from {}",
            entries.len(),
            path.display()
        );
        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, project_id: u64, contract: Option<&ContractDescriptor>) -> Option<&HandlerMetadata> {
        let exact = match contract {
            Some(descriptor) => HandlerId::with_contract(project_id, descriptor.name.clone()),
            None => HandlerId::new(project_id),
        };
        self.entries.get(&exact).or_else(|| {
            self.entries
                .iter()
                .find(|(id, _)| id.project_id == project_id)
                .map(|(_, metadata)| metadata)
        })
    }
}

#[async_trait]
impl MetadataSource for StaticMetadataSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_handler_metadata(
        &self,
        project_id: u64,
        contract: Option<&ContractDescriptor>,
    ) -> Result<HandlerMetadata, SourceError> {
        self.lookup(project_id, contract)
            .cloned()
            .ok_or(SourceError::NotFound(project_id))
    }
}
