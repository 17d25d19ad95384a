//! Composite handler identifiers.
//!
//! A handler is addressed as `"<project_id>-<contract_name>"`, where the
//! contract part is optional (`"23"` and `"23-ogcontract"` are both valid).
//! The same key joins channel config, handler config and the metadata source,
//! so it is parsed once when configuration is loaded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing a handler id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerIdError {
    #[error("Handler id is empty")]
    Empty,

    #[error("Handler id '{0}' must start with a numeric project id")]
    InvalidProjectId(String),

    #[error("Handler id '{0}' has an empty contract name")]
    EmptyContract(String),
}

/// Parsed `"<project_id>-<contract_name>"` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HandlerId {
    pub project_id: u64,
    pub contract: Option<String>,
}

impl HandlerId {
    /// Create a handler id without a contract.
    pub fn new(project_id: u64) -> Self {
        Self {
            project_id,
            contract: None,
        }
    }

    /// Create a handler id bound to a named contract.
    pub fn with_contract(project_id: u64, contract: impl Into<String>) -> Self {
        Self {
            project_id,
            contract: Some(contract.into()),
        }
    }

    pub fn contract(&self) -> Option<&str> {
        self.contract.as_deref()
    }
}

impl FromStr for HandlerId {
    type Err = HandlerIdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(HandlerIdError::Empty);
        }

        // Contract names may themselves contain dashes; only the first one separates.
        let (project, contract) = match raw.split_once('-') {
            Some((project, contract)) => (project, Some(contract)),
            None => (raw, None),
        };

        if project.is_empty() || !project.bytes().all(|b| b.is_ascii_digit()) {
            return Err(HandlerIdError::InvalidProjectId(raw.to_string()));
        }
        let project_id = project
            .parse::<u64>()
            .map_err(|_| HandlerIdError::InvalidProjectId(raw.to_string()))?;

        match contract {
            Some("") => Err(HandlerIdError::EmptyContract(raw.to_string())),
            Some(contract) => Ok(Self::with_contract(project_id, contract)),
            None => Ok(Self::new(project_id)),
        }
    }
}

impl TryFrom<String> for HandlerId {
    type Error = HandlerIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HandlerId> for String {
    fn from(id: HandlerId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.contract {
            Some(contract) => write!(f, "{}-{}", self.project_id, contract),
            None => write!(f, "{}", self.project_id),
        }
    }
}
