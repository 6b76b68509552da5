//! Old-version archiving.

use std::sync::Arc;

use larch_store::domain::{Entity, Version};
use larch_store::ports::{BlobStore, VersionIndex};
use tracing::debug;

use crate::error::Result;

/// Archive of historical entity versions: serialized pre-image snapshots in
/// the blob store's old-version namespace, located through the version
/// index. Records are append-only and never overwritten.
#[derive(Clone)]
pub struct VersionStore {
    blobs: Arc<dyn BlobStore>,
    index: Arc<dyn VersionIndex>,
}

impl VersionStore {
    pub fn new(blobs: Arc<dyn BlobStore>, index: Arc<dyn VersionIndex>) -> Self {
        Self { blobs, index }
    }

    /// Archive a pre-image snapshot. The blob is written first; only once
    /// it is durable does the version record go in. A crash between the
    /// two leaves an unreferenced blob, never a dangling record.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if a record for this `(id, version)` pair is
    /// already indexed.
    pub async fn add_old_version(&self, entity: &Entity) -> Result<()> {
        let path = self.blobs.create_old_version_blob(entity).await?;
        debug!(
            "archived entity {} version {} at {}",
            entity.id, entity.version, path
        );
        self.index
            .add(&Version::new(&entity.id, entity.version, path))
            .await?;
        Ok(())
    }

    /// Fetch one historical version.
    ///
    /// # Errors
    ///
    /// `NotFound` if the version was never archived.
    pub async fn get_old_version(&self, entity_id: &str, version_number: u32) -> Result<Entity> {
        let record = self.index.get(entity_id, version_number).await?;
        let bytes = self.blobs.retrieve_old_version_blob(&record.path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// All historical versions of an entity, most recent first.
    pub async fn get_old_versions(&self, entity_id: &str) -> Result<Vec<Entity>> {
        let records = self.index.list(entity_id).await?;
        let mut entities = Vec::with_capacity(records.len());
        for record in records {
            let bytes = self.blobs.retrieve_old_version_blob(&record.path).await?;
            entities.push(serde_json::from_slice(&bytes)?);
        }
        Ok(entities)
    }

    /// Drop all version records for an entity and delete their snapshot
    /// blobs. Only called when the deployment purges history on delete.
    pub async fn purge(&self, entity_id: &str) -> Result<()> {
        let records = self.index.purge(entity_id).await?;
        for record in &records {
            self.blobs.delete_old_version_blob(&record.path).await?;
        }
        debug!(
            "purged {} version records for entity {}",
            records.len(),
            entity_id
        );
        Ok(())
    }
}
