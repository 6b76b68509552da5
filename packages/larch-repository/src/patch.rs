//! Typed partial entity updates.

use larch_store::domain::{Entity, EntityState};
use serde::{Deserialize, Serialize};

use crate::error::{RepositoryError, Result};

/// A partial update to an entity's scalar fields. Absent fields are left
/// unchanged; the patched record then goes through the normal versioned
/// update path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<EntityState>,
}

impl EntityPatch {
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.entity_type.is_none()
            && self.parent_id.is_none()
            && self.state.is_none()
    }

    /// Apply the patch to a fetched current record.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the patch would make the entity its own parent.
    pub fn apply(&self, entity: &mut Entity) -> Result<()> {
        if let Some(parent_id) = &self.parent_id {
            if *parent_id == entity.id {
                return Err(RepositoryError::InvalidParameter(format!(
                    "Entity {} can not be its own parent",
                    entity.id
                )));
            }
            entity.parent_id = Some(parent_id.clone());
        }
        if let Some(label) = &self.label {
            entity.label = label.clone();
        }
        if let Some(entity_type) = &self.entity_type {
            entity.entity_type = Some(entity_type.clone());
        }
        if let Some(state) = self.state {
            entity.state = state;
        }
        Ok(())
    }
}
