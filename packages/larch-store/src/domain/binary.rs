use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Metadata;

/// A content stream attached to an entity, unique by name.
///
/// Incoming binaries carry their bytes in `content`; the service drains the
/// bytes into the blob store on ingest, filling `path`, `checksum` and
/// `size`. Stored records never retain `content`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Binary {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub mimetype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Blob store locator, assigned on ingest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Metadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_last_modified: Option<DateTime<Utc>>,
    /// Bytes to ingest; drained by the service, never persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<u8>>,
}

impl Binary {
    /// New binary carrying content to be ingested.
    pub fn new(name: impl Into<String>, mimetype: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mimetype: mimetype.into(),
            content: Some(content),
            ..Default::default()
        }
    }

    /// True once the content has been stored and a locator assigned.
    pub fn is_ingested(&self) -> bool {
        self.path.is_some()
    }
}
