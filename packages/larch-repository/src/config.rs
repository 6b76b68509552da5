//! Repository configuration.

use serde::{Deserialize, Serialize};

/// Tunable repository behavior. Injected into [`EntityService`]
/// alongside the store handles.
///
/// [`EntityService`]: crate::service::EntityService
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// When true, deleting an entity also removes its version records and
    /// snapshot blobs. Off by default: history outlives the current record.
    #[serde(default)]
    pub purge_history_on_delete: bool,

    /// Page size used when draining child ids on retrieval.
    #[serde(default = "default_children_page_size")]
    pub children_page_size: usize,

    /// Label substituted when a caller leaves the label empty.
    #[serde(default = "default_label")]
    pub default_label: String,
}

fn default_children_page_size() -> usize {
    64
}

fn default_label() -> String {
    "Unnamed entity".to_string()
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            purge_history_on_delete: false,
            children_page_size: default_children_page_size(),
            default_label: default_label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RepositoryConfig::default();
        assert!(!config.purge_history_on_delete);
        assert_eq!(config.children_page_size, 64);
        assert_eq!(config.default_label, "Unnamed entity");
    }

    #[test]
    fn test_deserialize_partial() {
        let config: RepositoryConfig =
            serde_json::from_str(r#"{"purge_history_on_delete": true}"#).unwrap();
        assert!(config.purge_history_on_delete);
        assert_eq!(config.children_page_size, 64);
    }
}
