use serde::{Deserialize, Serialize};

/// Append-only index record pointing at a historical entity snapshot blob.
///
/// One record is created per entity update and never mutated or deleted
/// (unless the deployment purges history on entity delete).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub entity_id: String,
    pub version_number: u32,
    /// Locator of the serialized entity snapshot in the old-version blob
    /// namespace
    pub path: String,
}

impl Version {
    pub fn new(
        entity_id: impl Into<String>,
        version_number: u32,
        path: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            version_number,
            path: path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_new() {
        let v = Version::new("abc", 2, "xy/123");
        assert_eq!(v.entity_id, "abc");
        assert_eq!(v.version_number, 2);
        assert_eq!(v.path, "xy/123");
    }

    #[test]
    fn test_version_serde_roundtrip() {
        let v = Version::new("abc", 7, "xy/123");
        let json = serde_json::to_string(&v).unwrap();
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
