//! Published-copy handling.

use std::sync::Arc;

use larch_store::domain::Entity;
use larch_store::ports::PublishIndex;
use larch_store::StorageError;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;

/// Writes and retrieves published entity copies. A published copy is an
/// independent snapshot in its own index; it never touches the current
/// record or the version history.
#[derive(Clone)]
pub struct PublishService {
    index: Arc<dyn PublishIndex>,
}

impl PublishService {
    pub fn new(index: Arc<dyn PublishIndex>) -> Self {
        Self { index }
    }

    /// Store a published copy of the entity and return its publish id.
    /// A fresh id is assigned when the entity does not already carry one,
    /// so repeated publishes yield independent snapshots.
    pub async fn publish(&self, entity: &Entity) -> Result<String> {
        let mut copy = entity.clone();
        let publish_id = match copy.publish_id.clone() {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().simple().to_string();
                copy.publish_id = Some(id.clone());
                id
            }
        };
        self.index.put(&copy).await?;
        info!(
            "published entity {} version {} as {}",
            copy.id, copy.version, publish_id
        );
        Ok(publish_id)
    }

    /// Fetch one published copy by publish id.
    pub async fn retrieve(&self, publish_id: &str) -> Result<Entity> {
        Ok(self.index.get(publish_id).await?)
    }

    /// All published copies of an entity, ascending by the version captured
    /// at publish time.
    ///
    /// # Errors
    ///
    /// `NotFound` if the entity has never been published.
    pub async fn retrieve_published_entities(&self, entity_id: &str) -> Result<Vec<Entity>> {
        let copies = self.index.list_for_entity(entity_id).await?;
        if copies.is_empty() {
            return Err(StorageError::not_found(format!(
                "Entity {} has no published copies",
                entity_id
            ))
            .into());
        }
        Ok(copies)
    }
}
