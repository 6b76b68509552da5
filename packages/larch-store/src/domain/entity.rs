use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AlternativeIdentifier, Binary, Metadata};

/// Lifecycle state of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityState {
    /// Freshly created, not yet published or archived
    #[default]
    Ingested,
    /// A published copy exists in the publish index
    Published,
    /// Demoted to archival storage
    Archived,
}

impl EntityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityState::Ingested => "ingested",
            EntityState::Published => "published",
            EntityState::Archived => "archived",
        }
    }
}

impl std::fmt::Display for EntityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The top-level versionable repository object.
///
/// `id` is stable across versions; `version` starts at 1 and increases by
/// one on every update. `children` is derived from the index (entities whose
/// `parent_id` equals this id) and is only populated on current-version
/// retrieval — historical snapshots never carry it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entity {
    /// Entity id, stable across versions
    #[serde(default)]
    pub id: String,
    /// Version number, 1-based, contiguous per id
    #[serde(default)]
    pub version: u32,
    /// Human-readable label; defaulted when empty
    #[serde(default)]
    pub label: String,
    /// Free-form type tag ("book", "image", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    /// Optional parent entity id, forming a tree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Lifecycle state
    #[serde(default)]
    pub state: EntityState,
    /// Set once at creation, carried forward on every update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_created: Option<DateTime<Utc>>,
    /// Updated on every version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_last_modified: Option<DateTime<Utc>>,
    /// Ordered tag list
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Derived child ids; never persisted as part of the record
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    /// Metadata payloads, unique by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Metadata>,
    /// Attached binaries, unique by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub binaries: BTreeMap<String, Binary>,
    /// Relations: predicate -> ordered object ids
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relations: BTreeMap<String, Vec<String>>,
    /// Alternative identifiers (DOI, URN)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternative_identifiers: Vec<AlternativeIdentifier>,
    /// Set only on copies written to the publish index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_id: Option<String>,
}

impl Entity {
    /// Create an entity shell with the given label. Id, version, state and
    /// timestamps are assigned by the service on create.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}
