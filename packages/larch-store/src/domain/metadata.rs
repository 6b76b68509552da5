use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named payload (often XML) attached to an entity or binary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    /// References the metadata type used for schema validation
    #[serde(default)]
    pub md_type: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub mimetype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_last_modified: Option<DateTime<Utc>>,
}

impl Metadata {
    pub fn new(
        name: impl Into<String>,
        md_type: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            md_type: md_type.into(),
            data: data.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_new() {
        let md = Metadata::new("dc", "DC", "<dc/>");
        assert_eq!(md.name, "dc");
        assert_eq!(md.md_type, "DC");
        assert_eq!(md.data, "<dc/>");
        assert!(md.utc_created.is_none());
    }

    #[test]
    fn test_metadata_serde_roundtrip() {
        let mut md = Metadata::new("dc", "DC", "<dc/>");
        md.mimetype = "application/xml".to_string();
        md.utc_created = Some(Utc::now());
        md.utc_last_modified = md.utc_created;

        let json = serde_json::to_string(&md).unwrap();
        let back: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, md);
    }
}
