//! Handler metadata types exchanged with the metadata source.

use serde::{Deserialize, Serialize};

use crate::handler_id::HandlerId;

/// Partner contract descriptor.
///
/// The routing core treats the attributes as opaque and hands them to the
/// metadata source unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractDescriptor {
    /// Contract name as referenced from handler ids
    #[serde(default)]
    pub name: String,
    /// Source-specific attributes (address, chain, standard, ...)
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ContractDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: serde_json::Map::new(),
        }
    }

    /// Set a single attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }
}

/// Labels a handler uses when rendering grouped output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedMappings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub singles: Option<String>,
}

impl NamedMappings {
    pub fn is_empty(&self) -> bool {
        self.sets.is_none() && self.singles.is_none()
    }
}

/// Current metadata for one handler, as reported by the metadata source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerMetadata {
    #[serde(alias = "invocations")]
    pub invocation_count: u64,
    pub name: String,
    pub active: bool,
    #[serde(default, alias = "contract")]
    pub contract_id: Option<String>,
}

/// A handler's registry entry: its id, fetched metadata and config mappings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerRecord {
    pub id: HandlerId,
    pub project_id: u64,
    pub contract_id: Option<String>,
    pub invocation_count: u64,
    pub name: String,
    pub active: bool,
    #[serde(default)]
    pub named_mappings: NamedMappings,
}

impl HandlerRecord {
    /// Combine fetched metadata with the handler's configured mappings.
    pub fn from_metadata(
        id: HandlerId,
        metadata: HandlerMetadata,
        named_mappings: NamedMappings,
    ) -> Self {
        Self {
            project_id: id.project_id,
            id,
            contract_id: metadata.contract_id,
            invocation_count: metadata.invocation_count,
            name: metadata.name,
            active: metadata.active,
            named_mappings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_accepts_source_field_names() {
        let json = r#"{"invocations": 12, "name": "OG", "active": true, "contract": "0xabc"}"#;
        let metadata: HandlerMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.invocation_count, 12);
        assert_eq!(metadata.contract_id.as_deref(), Some("0xabc"));
    }

    #[test]
    fn test_record_from_metadata() {
        let id = HandlerId::with_contract(23, "ogcontract");
        let metadata = HandlerMetadata {
            invocation_count: 3,
            name: "OG Collection".to_string(),
            active: false,
            contract_id: None,
        };
        let mappings = NamedMappings {
            sets: Some("Bundles".to_string()),
            singles: None,
        };

        let record = HandlerRecord::from_metadata(id.clone(), metadata, mappings.clone());
        assert_eq!(record.id, id);
        assert_eq!(record.project_id, 23);
        assert_eq!(record.named_mappings, mappings);
        assert!(!record.active);
    }

    #[test]
    fn test_contract_descriptor_flattens_attributes() {
        let descriptor: ContractDescriptor = toml::from_str(
            r#"
            address = "0x1234"
            chain = "ethereum"
            "#,
        )
        .unwrap();
        assert_eq!(descriptor.name, "");
        assert_eq!(
            descriptor.attribute("address"),
            Some(&serde_json::Value::String("0x1234".to_string()))
        );
    }
}
