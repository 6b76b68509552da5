use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Closed set of alternative identifier types, checked at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdentifierType {
    Doi,
    Urn,
}

impl IdentifierType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierType::Doi => "DOI",
            IdentifierType::Urn => "URN",
        }
    }
}

impl std::fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IdentifierType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DOI" => Ok(IdentifierType::Doi),
            "URN" => Ok(IdentifierType::Urn),
            other => Err(StorageError::invalid_parameter(format!(
                "Unknown identifier type: {}",
                other
            ))),
        }
    }
}

/// A typed external identifier attached to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeIdentifier {
    pub id_type: IdentifierType,
    pub value: String,
}

impl AlternativeIdentifier {
    pub fn new(id_type: IdentifierType, value: impl Into<String>) -> Self {
        Self {
            id_type,
            value: value.into(),
        }
    }
}
