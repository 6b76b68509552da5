//! The entity versioning service.
//!
//! Every mutation of an existing entity goes through one protocol: fetch
//! the current record (the pre-image), archive it durably, then write the
//! successor with a compare-and-swap against the pre-image's version. Two
//! writers racing from the same pre-image cannot both win; the
//! compare-and-swap fails the loser with `Conflict`. An interrupted
//! attempt that archived its pre-image but never reached the index write
//! is harmless; the retry finds the snapshot in place and continues.

use std::sync::Arc;

use chrono::Utc;
use larch_store::domain::{
    AlternativeIdentifier, AuditAction, AuditRecord, Binary, Entity, EntityState, IdentifierType,
    Metadata, Workspace,
};
use larch_store::ports::{AuditSink, BlobStore, IndexStore, WorkspaceIndex};
use larch_store::{ErrorKind, StorageError};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RepositoryConfig;
use crate::error::{RepositoryError, Result};
use crate::patch::EntityPatch;
use crate::publish::PublishService;
use crate::versions::VersionStore;

const CHECKSUM_TYPE: &str = "SHA-256";
const AUDIT_AGENT: &str = "system";

/// Prefix marking relation objects that refer to entities in this
/// repository; such targets must exist when the relation is created.
const INTERNAL_ID_PREFIX: &str = "larch:";

pub struct EntityService {
    index: Arc<dyn IndexStore>,
    blobs: Arc<dyn BlobStore>,
    versions: VersionStore,
    publisher: PublishService,
    workspaces: Arc<dyn WorkspaceIndex>,
    audit: Arc<dyn AuditSink>,
    config: RepositoryConfig,
}

impl EntityService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: Arc<dyn IndexStore>,
        blobs: Arc<dyn BlobStore>,
        versions: VersionStore,
        publisher: PublishService,
        workspaces: Arc<dyn WorkspaceIndex>,
        audit: Arc<dyn AuditSink>,
        config: RepositoryConfig,
    ) -> Self {
        Self {
            index,
            blobs,
            versions,
            publisher,
            workspaces,
            audit,
            config,
        }
    }

    // ----- entity lifecycle -------------------------------------------------

    /// Create a new entity and return its id.
    ///
    /// A missing id is generated (retried until unused); a caller-supplied
    /// id that is already taken fails `AlreadyExists`. The record starts at
    /// version 1 in state `Ingested` with `utc_created == utc_last_modified`.
    pub async fn create(&self, mut entity: Entity) -> Result<String> {
        if entity.id.is_empty() {
            loop {
                let candidate = Uuid::new_v4().simple().to_string();
                if !self.index.exists(&candidate).await? {
                    entity.id = candidate;
                    break;
                }
            }
        } else if self.index.exists(&entity.id).await? {
            return Err(StorageError::already_exists(format!(
                "Entity with id {} already exists",
                entity.id
            ))
            .into());
        }

        let now = Utc::now();
        entity.version = 1;
        entity.state = EntityState::Ingested;
        entity.utc_created = Some(now);
        entity.utc_last_modified = Some(now);
        entity.children.clear();
        entity.publish_id = None;
        self.default_label(&mut entity);
        self.stamp_metadata(&mut entity);
        self.ingest_binaries(&mut entity, None).await?;

        let id = self.index.create(&entity).await?;
        info!("created entity {}", id);
        self.emit_audit(&id, AuditAction::CreateEntity).await;
        Ok(id)
    }

    /// Replace the current record with a new version.
    ///
    /// The pre-image is archived before the index write; the write itself
    /// is a compare-and-swap against the pre-image's version, so a
    /// concurrent update from the same pre-image fails `Conflict` and
    /// leaves no stray history.
    pub async fn update(&self, entity: Entity) -> Result<()> {
        let pre = self.index.retrieve(&entity.id).await?;
        // A caller carrying a version number claims that pre-image; a stale
        // claim fails fast. Version 0 (the Default) makes no claim.
        if entity.version != 0 && entity.version != pre.version {
            return Err(StorageError::conflict(format!(
                "Entity {} expected version {}, found {}",
                entity.id, entity.version, pre.version
            ))
            .into());
        }
        self.write_new_version(&pre, entity).await?;
        self.emit_audit(&pre.id, AuditAction::UpdateEntity).await;
        Ok(())
    }

    /// Fetch the current record with its `children` populated from the
    /// index, one page at a time.
    pub async fn retrieve(&self, id: &str) -> Result<Entity> {
        let mut entity = self.index.retrieve(id).await?;
        entity.children = self.drain_children(id).await?;
        Ok(entity)
    }

    /// Fetch one version of an entity. Asking for the current version
    /// returns the stored record as-is (no children); older versions come
    /// from the archive.
    pub async fn retrieve_version(&self, id: &str, version_number: u32) -> Result<Entity> {
        let current = self.index.retrieve(id).await?;
        if current.version == version_number {
            return Ok(current);
        }
        self.versions.get_old_version(id, version_number).await
    }

    /// All archived versions of an entity, most recent first. The current
    /// version is not included.
    pub async fn old_versions(&self, id: &str) -> Result<Vec<Entity>> {
        self.versions.get_old_versions(id).await
    }

    /// Delete the current record and its binary blobs. Version history is
    /// retained unless the deployment purges it
    /// ([`RepositoryConfig::purge_history_on_delete`]).
    pub async fn delete(&self, id: &str) -> Result<()> {
        let entity = self.index.retrieve(id).await?;
        // The record goes first. Content blobs are only destroyed once no
        // current record references them; a failed delete leaves the
        // entity fully intact.
        self.index.delete(id).await?;
        for binary in entity.binaries.values() {
            if let Some(path) = &binary.path {
                self.blobs.delete(path).await?;
            }
        }
        if self.config.purge_history_on_delete {
            self.versions.purge(id).await?;
        }
        info!("deleted entity {}", id);
        self.emit_audit(id, AuditAction::DeleteEntity).await;
        Ok(())
    }

    /// Apply a typed partial update, then version the result like any
    /// other update. An empty patch is a no-op.
    pub async fn patch(&self, id: &str, patch: &EntityPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let pre = self.index.retrieve(id).await?;
        let mut next = pre.clone();
        patch.apply(&mut next)?;
        if let Some(parent_id) = &next.parent_id {
            if pre.parent_id.as_deref() != Some(parent_id) && !self.index.exists(parent_id).await? {
                return Err(RepositoryError::InvalidParameter(format!(
                    "Parent entity {} does not exist",
                    parent_id
                )));
            }
        }
        self.write_new_version(&pre, next).await?;
        self.emit_audit(id, AuditAction::UpdateEntity).await;
        Ok(())
    }

    // ----- binaries ---------------------------------------------------------

    /// Attach a new binary to an entity. The content is ingested into the
    /// blob store and the entity is versioned.
    pub async fn create_binary(&self, id: &str, binary: Binary) -> Result<()> {
        if binary.name.is_empty() {
            return Err(RepositoryError::InvalidParameter(
                "Binary name must not be empty".to_string(),
            ));
        }
        if binary.content.is_none() {
            return Err(RepositoryError::InvalidParameter(format!(
                "Binary {} carries no content",
                binary.name
            )));
        }
        let pre = self.index.retrieve(id).await?;
        if pre.binaries.contains_key(&binary.name) {
            return Err(StorageError::already_exists(format!(
                "Binary {} already exists on entity {}",
                binary.name, id
            ))
            .into());
        }
        let mut next = pre.clone();
        next.binaries.insert(binary.name.clone(), binary);
        self.write_new_version(&pre, next).await?;
        self.emit_audit(id, AuditAction::CreateBinary).await;
        Ok(())
    }

    /// Remove a binary and its blob, versioning the entity.
    pub async fn delete_binary(&self, id: &str, name: &str) -> Result<()> {
        let pre = self.index.retrieve(id).await?;
        let mut next = pre.clone();
        let binary = next.binaries.remove(name).ok_or_else(|| {
            StorageError::not_found(format!("Binary {} not found on entity {}", name, id))
        })?;
        // Version the entity first; the blob is only destroyed once the
        // current record no longer references it.
        self.write_new_version(&pre, next).await?;
        if let Some(path) = &binary.path {
            self.blobs.delete(path).await?;
        }
        self.emit_audit(id, AuditAction::DeleteBinary).await;
        Ok(())
    }

    /// Fetch a binary's descriptor from the current record.
    pub async fn retrieve_binary(&self, id: &str, name: &str) -> Result<Binary> {
        let entity = self.index.retrieve(id).await?;
        entity.binaries.get(name).cloned().ok_or_else(|| {
            StorageError::not_found(format!("Binary {} not found on entity {}", name, id)).into()
        })
    }

    /// Fetch a binary's content bytes.
    pub async fn retrieve_content(&self, id: &str, name: &str) -> Result<Vec<u8>> {
        let binary = self.retrieve_binary(id, name).await?;
        let path = binary.path.ok_or_else(|| {
            StorageError::not_found(format!(
                "Binary {} on entity {} has no stored content",
                name, id
            ))
        })?;
        Ok(self.blobs.retrieve(&path).await?)
    }

    // ----- metadata ---------------------------------------------------------

    /// Remove an entity-level metadata payload, versioning the entity.
    pub async fn delete_metadata(&self, id: &str, name: &str) -> Result<()> {
        let pre = self.index.retrieve(id).await?;
        let mut next = pre.clone();
        if next.metadata.remove(name).is_none() {
            return Err(StorageError::not_found(format!(
                "Metadata {} not found on entity {}",
                name, id
            ))
            .into());
        }
        self.write_new_version(&pre, next).await?;
        self.emit_audit(id, AuditAction::DeleteMetadata).await;
        Ok(())
    }

    /// Remove a metadata payload attached to a binary, versioning the
    /// entity.
    pub async fn delete_binary_metadata(
        &self,
        id: &str,
        binary_name: &str,
        name: &str,
    ) -> Result<()> {
        let pre = self.index.retrieve(id).await?;
        let mut next = pre.clone();
        let binary = next.binaries.get_mut(binary_name).ok_or_else(|| {
            StorageError::not_found(format!(
                "Binary {} not found on entity {}",
                binary_name, id
            ))
        })?;
        if binary.metadata.remove(name).is_none() {
            return Err(StorageError::not_found(format!(
                "Metadata {} not found on binary {} of entity {}",
                name, binary_name, id
            ))
            .into());
        }
        self.write_new_version(&pre, next).await?;
        self.emit_audit(id, AuditAction::DeleteMetadata).await;
        Ok(())
    }

    // ----- identifiers and relations ----------------------------------------

    /// Attach an alternative identifier. The type must parse into the
    /// closed [`IdentifierType`] set and the value must not be blank.
    pub async fn create_identifier(&self, id: &str, id_type: &str, value: &str) -> Result<()> {
        let id_type: IdentifierType = id_type.parse()?;
        if value.trim().is_empty() {
            return Err(RepositoryError::InvalidParameter(
                "Identifier value must not be blank".to_string(),
            ));
        }
        let pre = self.index.retrieve(id).await?;
        let mut next = pre.clone();
        next.alternative_identifiers
            .push(AlternativeIdentifier::new(id_type, value));
        self.write_new_version(&pre, next).await?;
        self.emit_audit(id, AuditAction::CreateIdentifier).await;
        Ok(())
    }

    /// Remove an alternative identifier by type and value.
    pub async fn delete_identifier(&self, id: &str, id_type: &str, value: &str) -> Result<()> {
        let id_type: IdentifierType = id_type.parse()?;
        let pre = self.index.retrieve(id).await?;
        let mut next = pre.clone();
        let before = next.alternative_identifiers.len();
        next.alternative_identifiers
            .retain(|ident| !(ident.id_type == id_type && ident.value == value));
        if next.alternative_identifiers.len() == before {
            return Err(StorageError::not_found(format!(
                "Identifier {}:{} not found on entity {}",
                id_type, value, id
            ))
            .into());
        }
        self.write_new_version(&pre, next).await?;
        self.emit_audit(id, AuditAction::DeleteIdentifier).await;
        Ok(())
    }

    /// Append an object to a relation's ordered object list. Objects with
    /// the internal id prefix must name an existing entity.
    pub async fn create_relation(&self, id: &str, predicate: &str, object: &str) -> Result<()> {
        if predicate.trim().is_empty() {
            return Err(RepositoryError::InvalidParameter(
                "Relation predicate must not be blank".to_string(),
            ));
        }
        if let Some(target) = object.strip_prefix(INTERNAL_ID_PREFIX) {
            if !self.index.exists(target).await? {
                return Err(RepositoryError::InvalidParameter(format!(
                    "Relation target {} does not exist",
                    target
                )));
            }
        }
        let pre = self.index.retrieve(id).await?;
        let mut next = pre.clone();
        next.relations
            .entry(predicate.to_string())
            .or_default()
            .push(object.to_string());
        self.write_new_version(&pre, next).await?;
        self.emit_audit(id, AuditAction::CreateRelation).await;
        Ok(())
    }

    // ----- publishing -------------------------------------------------------

    /// Publish the current version: stamp `Published` state and a fresh
    /// publish id, bump the version through the normal update path, then
    /// copy the published snapshot into the publish index. Each publish
    /// yields an independent snapshot.
    pub async fn publish(&self, id: &str) -> Result<String> {
        let pre = self.index.retrieve(id).await?;
        let mut next = pre.clone();
        next.state = EntityState::Published;
        next.publish_id = Some(Uuid::new_v4().simple().to_string());

        let published = self.write_new_version(&pre, next).await?;
        let publish_id = self.publisher.publish(&published).await?;
        self.emit_audit(id, AuditAction::PublishEntity).await;
        Ok(publish_id)
    }

    /// Fetch a published copy by publish id.
    pub async fn retrieve_published(&self, publish_id: &str) -> Result<Entity> {
        self.publisher.retrieve(publish_id).await
    }

    /// All published copies of an entity, oldest first.
    pub async fn published_versions(&self, id: &str) -> Result<Vec<Entity>> {
        self.publisher.retrieve_published_entities(id).await
    }

    // ----- workspaces -------------------------------------------------------

    pub async fn create_workspace(&self, workspace: &Workspace) -> Result<String> {
        Ok(self.workspaces.create(workspace).await?)
    }

    pub async fn retrieve_workspace(&self, id: &str) -> Result<Workspace> {
        Ok(self.workspaces.retrieve(id).await?)
    }

    pub async fn update_workspace(&self, workspace: &Workspace) -> Result<()> {
        Ok(self.workspaces.update(workspace).await?)
    }

    // ----- protocol internals -----------------------------------------------

    /// The versioning protocol. Archives `pre`, stamps `next` as its
    /// successor and compare-and-swap-writes it to the index. Returns the
    /// stamped record.
    ///
    /// Ordering matters: the snapshot must be durable before the current
    /// record is overwritten. A crash between the two leaves an archived
    /// snapshot and an unchanged current record, which a later retry
    /// resolves; it never loses a version.
    async fn write_new_version(&self, pre: &Entity, mut next: Entity) -> Result<Entity> {
        match self.versions.add_old_version(pre).await {
            Ok(()) => {}
            // The pre-image was already archived: either an interrupted
            // earlier attempt died between archive and index write, or a
            // concurrent writer got there first. Both snapshots come from
            // the same pre-image, so the archive is correct as-is; the
            // compare-and-swap below decides who wins.
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                debug!(
                    "entity {} version {} already archived, proceeding to index write",
                    pre.id, pre.version
                );
            }
            Err(err) => return Err(err),
        }

        next.id = pre.id.clone();
        next.version = pre.version + 1;
        next.utc_created = pre.utc_created;
        next.utc_last_modified = Some(Utc::now());
        next.children.clear();
        self.default_label(&mut next);
        self.stamp_metadata(&mut next);
        self.ingest_binaries(&mut next, Some(pre)).await?;

        self.index.update(&next, pre.version).await?;
        debug!("entity {} now at version {}", next.id, next.version);
        Ok(next)
    }

    fn default_label(&self, entity: &mut Entity) {
        if entity.label.trim().is_empty() {
            entity.label = self.config.default_label.clone();
        }
    }

    fn stamp_metadata(&self, entity: &mut Entity) {
        let now = Utc::now();
        for metadata in entity.metadata.values_mut() {
            Self::stamp_one_metadata(metadata, now);
        }
        for binary in entity.binaries.values_mut() {
            for metadata in binary.metadata.values_mut() {
                Self::stamp_one_metadata(metadata, now);
            }
        }
    }

    fn stamp_one_metadata(metadata: &mut Metadata, now: chrono::DateTime<Utc>) {
        if metadata.utc_created.is_none() {
            metadata.utc_created = Some(now);
        }
        if metadata.utc_last_modified.is_none() {
            metadata.utc_last_modified = Some(now);
        }
    }

    /// Drain incoming binary content into the blob store, filling path,
    /// checksum and size. Binaries without content carry their stored
    /// locator forward from the pre-image.
    async fn ingest_binaries(&self, entity: &mut Entity, pre: Option<&Entity>) -> Result<()> {
        let now = Utc::now();
        for (name, binary) in entity.binaries.iter_mut() {
            match binary.content.take() {
                Some(bytes) => {
                    let path = match &binary.path {
                        // Replacing content of an already stored binary.
                        Some(path) => {
                            self.blobs.update(path, &bytes).await?;
                            path.clone()
                        }
                        None => self.blobs.create(&bytes).await?,
                    };
                    binary.path = Some(path);
                    binary.size = bytes.len() as u64;
                    binary.checksum = Some(hex::encode(Sha256::digest(&bytes)));
                    binary.checksum_type = Some(CHECKSUM_TYPE.to_string());
                    if binary.utc_created.is_none() {
                        binary.utc_created = Some(now);
                    }
                    binary.utc_last_modified = Some(now);
                }
                None if binary.path.is_none() => {
                    let carried = pre.and_then(|p| p.binaries.get(name));
                    match carried {
                        Some(stored) if stored.path.is_some() => {
                            binary.path = stored.path.clone();
                            binary.size = stored.size;
                            binary.checksum = stored.checksum.clone();
                            binary.checksum_type = stored.checksum_type.clone();
                            binary.utc_created = stored.utc_created;
                            binary.utc_last_modified = stored.utc_last_modified;
                        }
                        _ => {
                            return Err(RepositoryError::InvalidParameter(format!(
                                "Binary {} carries no content",
                                name
                            )));
                        }
                    }
                }
                None => {}
            }
        }
        Ok(())
    }

    async fn drain_children(&self, id: &str) -> Result<Vec<String>> {
        let page_size = self.config.children_page_size;
        let mut children = Vec::new();
        let mut from = 0;
        loop {
            let page = self.index.children_of(id, from, page_size).await?;
            let short = page.len() < page_size;
            children.extend(page);
            if short {
                break;
            }
            from += page_size;
        }
        Ok(children)
    }

    /// Audit records are best-effort: a sink failure is logged, never
    /// propagated into the mutation result.
    async fn emit_audit(&self, entity_id: &str, action: AuditAction) {
        let record = AuditRecord::new(entity_id, AUDIT_AGENT, action);
        if let Err(err) = self.audit.record(&record).await {
            warn!("audit record for entity {} dropped: {}", entity_id, err);
        }
    }
}
