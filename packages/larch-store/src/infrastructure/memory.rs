//! In-memory adapters for every storage port.
//!
//! Used by unit and integration tests and as a reference implementation of
//! the port contracts. Compare-and-swap on `update` happens under the map
//! entry lock, so two racing writers against the same pre-image cannot both
//! win.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::domain::{AuditRecord, Entity, Version, Workspace};
use crate::ports::{AuditSink, BlobStore, IndexStore, PublishIndex, VersionIndex, WorkspaceIndex};
use crate::{Result, StorageError};

/// In-memory current-record store.
#[derive(Default)]
pub struct MemoryIndexStore {
    entities: DashMap<String, Entity>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn create(&self, entity: &Entity) -> Result<String> {
        match self.entities.entry(entity.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StorageError::already_exists(
                format!("Entity with id {} already exists", entity.id),
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(entity.clone());
                Ok(entity.id.clone())
            }
        }
    }

    async fn update(&self, entity: &Entity, expected_version: u32) -> Result<()> {
        match self.entities.get_mut(&entity.id) {
            None => Err(StorageError::not_found(format!(
                "Entity with id {} not found",
                entity.id
            ))),
            Some(mut current) => {
                if current.version != expected_version {
                    return Err(StorageError::conflict(format!(
                        "Entity {} expected version {}, found {}",
                        entity.id, expected_version, current.version
                    )));
                }
                *current = entity.clone();
                Ok(())
            }
        }
    }

    async fn retrieve(&self, id: &str) -> Result<Entity> {
        self.entities
            .get(id)
            .map(|e| e.clone())
            .ok_or_else(|| StorageError::not_found(format!("Entity with id {} not found", id)))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.entities
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(format!("Entity with id {} not found", id)))
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.entities.contains_key(id))
    }

    async fn children_of(&self, parent_id: &str, from: usize, size: usize) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .entities
            .iter()
            .filter(|e| e.parent_id.as_deref() == Some(parent_id))
            .map(|e| e.id.clone())
            .collect();
        ids.sort();
        Ok(ids.into_iter().skip(from).take(size).collect())
    }
}

/// In-memory blob store with separate binary and old-version namespaces.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, Vec<u8>>,
    old_versions: DashMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }

    pub fn old_version_count(&self) -> usize {
        self.old_versions.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn create(&self, bytes: &[u8]) -> Result<String> {
        let path = Uuid::new_v4().simple().to_string();
        self.blobs.insert(path.clone(), bytes.to_vec());
        Ok(path)
    }

    async fn retrieve(&self, path: &str) -> Result<Vec<u8>> {
        self.blobs
            .get(path)
            .map(|b| b.clone())
            .ok_or_else(|| StorageError::not_found(format!("No blob at {}", path)))
    }

    async fn update(&self, path: &str, bytes: &[u8]) -> Result<()> {
        match self.blobs.get_mut(path) {
            None => Err(StorageError::not_found(format!("No blob at {}", path))),
            Some(mut blob) => {
                *blob = bytes.to_vec();
                Ok(())
            }
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.blobs
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(format!("No blob at {}", path)))
    }

    async fn create_old_version_blob(&self, entity: &Entity) -> Result<String> {
        let bytes = serde_json::to_vec(entity)?;
        let path = Uuid::new_v4().simple().to_string();
        self.old_versions.insert(path.clone(), bytes);
        Ok(path)
    }

    async fn retrieve_old_version_blob(&self, path: &str) -> Result<Vec<u8>> {
        self.old_versions
            .get(path)
            .map(|b| b.clone())
            .ok_or_else(|| StorageError::not_found(format!("No snapshot blob at {}", path)))
    }

    async fn delete_old_version_blob(&self, path: &str) -> Result<()> {
        self.old_versions
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(format!("No snapshot blob at {}", path)))
    }
}

/// In-memory append-only version log.
#[derive(Default)]
pub struct MemoryVersionIndex {
    versions: DashMap<String, Vec<Version>>,
}

impl MemoryVersionIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VersionIndex for MemoryVersionIndex {
    async fn add(&self, version: &Version) -> Result<()> {
        let mut records = self.versions.entry(version.entity_id.clone()).or_default();
        if records
            .iter()
            .any(|v| v.version_number == version.version_number)
        {
            return Err(StorageError::already_exists(format!(
                "Version record for entity {} version {} already exists",
                version.entity_id, version.version_number
            )));
        }
        records.push(version.clone());
        Ok(())
    }

    async fn get(&self, entity_id: &str, version_number: u32) -> Result<Version> {
        self.versions
            .get(entity_id)
            .and_then(|records| {
                records
                    .iter()
                    .find(|v| v.version_number == version_number)
                    .cloned()
            })
            .ok_or_else(|| {
                StorageError::not_found(format!(
                    "Entity {} does not exist with version {}",
                    entity_id, version_number
                ))
            })
    }

    async fn list(&self, entity_id: &str) -> Result<Vec<Version>> {
        let mut records = self
            .versions
            .get(entity_id)
            .map(|r| r.clone())
            .unwrap_or_default();
        records.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(records)
    }

    async fn purge(&self, entity_id: &str) -> Result<Vec<Version>> {
        Ok(self
            .versions
            .remove(entity_id)
            .map(|(_, records)| records)
            .unwrap_or_default())
    }
}

/// In-memory publish index keyed by publish id.
#[derive(Default)]
pub struct MemoryPublishIndex {
    published: DashMap<String, Entity>,
}

impl MemoryPublishIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PublishIndex for MemoryPublishIndex {
    async fn put(&self, entity: &Entity) -> Result<()> {
        let publish_id = entity.publish_id.clone().ok_or_else(|| {
            StorageError::invalid_parameter("Published entity carries no publish id")
        })?;
        self.published.insert(publish_id, entity.clone());
        Ok(())
    }

    async fn get(&self, publish_id: &str) -> Result<Entity> {
        self.published
            .get(publish_id)
            .map(|e| e.clone())
            .ok_or_else(|| {
                StorageError::not_found(format!(
                    "No published entity for publish id {}",
                    publish_id
                ))
            })
    }

    async fn list_for_entity(&self, entity_id: &str) -> Result<Vec<Entity>> {
        let mut copies: Vec<Entity> = self
            .published
            .iter()
            .filter(|e| e.id == entity_id)
            .map(|e| e.clone())
            .collect();
        copies.sort_by_key(|e| e.version);
        Ok(copies)
    }
}

/// In-memory workspace store.
#[derive(Default)]
pub struct MemoryWorkspaceIndex {
    workspaces: DashMap<String, Workspace>,
}

impl MemoryWorkspaceIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkspaceIndex for MemoryWorkspaceIndex {
    async fn create(&self, workspace: &Workspace) -> Result<String> {
        let mut ws = workspace.clone();
        if ws.id.is_empty() {
            ws.id = Uuid::new_v4().simple().to_string();
        }
        match self.workspaces.entry(ws.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StorageError::already_exists(
                format!("Workspace with id {} already exists", ws.id),
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let id = ws.id.clone();
                slot.insert(ws);
                Ok(id)
            }
        }
    }

    async fn retrieve(&self, id: &str) -> Result<Workspace> {
        self.workspaces
            .get(id)
            .map(|w| w.clone())
            .ok_or_else(|| StorageError::not_found(format!("Workspace with id {} not found", id)))
    }

    async fn update(&self, workspace: &Workspace) -> Result<()> {
        match self.workspaces.get_mut(&workspace.id) {
            None => Err(StorageError::not_found(format!(
                "Workspace with id {} not found",
                workspace.id
            ))),
            Some(mut current) => {
                *current = workspace.clone();
                Ok(())
            }
        }
    }
}

/// Audit sink collecting records in memory; tests inspect `records()`.
#[derive(Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn entity(id: &str, version: u32) -> Entity {
        let mut e = Entity::new(format!("entity {}", id));
        e.id = id.to_string();
        e.version = version;
        e
    }

    #[tokio::test]
    async fn test_create_and_retrieve() {
        let store = MemoryIndexStore::new();
        store.create(&entity("a", 1)).await.unwrap();

        let got = store.retrieve("a").await.unwrap();
        assert_eq!(got.id, "a");
        assert_eq!(got.version, 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_fails() {
        let store = MemoryIndexStore::new();
        store.create(&entity("a", 1)).await.unwrap();

        let err = store.create(&entity("a", 1)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_update_cas_conflict() {
        let store = MemoryIndexStore::new();
        store.create(&entity("a", 1)).await.unwrap();

        store.update(&entity("a", 2), 1).await.unwrap();

        // A second writer still holding the version-1 pre-image loses.
        let err = store.update(&entity("a", 2), 1).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        assert_eq!(store.retrieve("a").await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_update_missing_entity() {
        let store = MemoryIndexStore::new();
        let err = store.update(&entity("ghost", 2), 1).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_children_paging() {
        let store = MemoryIndexStore::new();
        store.create(&entity("root", 1)).await.unwrap();
        for i in 0..5 {
            let mut child = entity(&format!("c{}", i), 1);
            child.parent_id = Some("root".to_string());
            store.create(&child).await.unwrap();
        }

        let first = store.children_of("root", 0, 2).await.unwrap();
        let second = store.children_of("root", 2, 2).await.unwrap();
        let third = store.children_of("root", 4, 2).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(third.len(), 1);

        let all: Vec<_> = first.into_iter().chain(second).chain(third).collect();
        assert_eq!(all, vec!["c0", "c1", "c2", "c3", "c4"]);
    }

    #[tokio::test]
    async fn test_blob_lifecycle() {
        let blobs = MemoryBlobStore::new();
        let path = blobs.create(b"hello").await.unwrap();

        assert_eq!(blobs.retrieve(&path).await.unwrap(), b"hello");

        blobs.update(&path, b"world").await.unwrap();
        assert_eq!(blobs.retrieve(&path).await.unwrap(), b"world");

        blobs.delete(&path).await.unwrap();
        let err = blobs.retrieve(&path).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_blob_update_missing_path() {
        let blobs = MemoryBlobStore::new();
        let err = blobs.update("nope", b"x").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_old_version_blob_roundtrip() {
        let blobs = MemoryBlobStore::new();
        let e = entity("a", 3);

        let path = blobs.create_old_version_blob(&e).await.unwrap();
        let bytes = blobs.retrieve_old_version_blob(&path).await.unwrap();
        let back: Entity = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(back, e);
        assert_eq!(blobs.blob_count(), 0);
        assert_eq!(blobs.old_version_count(), 1);
    }

    #[tokio::test]
    async fn test_version_index_rejects_duplicates() {
        let index = MemoryVersionIndex::new();
        index.add(&Version::new("a", 1, "p1")).await.unwrap();

        let err = index.add(&Version::new("a", 1, "p2")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);

        index.add(&Version::new("a", 2, "p2")).await.unwrap();
    }

    #[tokio::test]
    async fn test_version_index_list_descending() {
        let index = MemoryVersionIndex::new();
        for n in 1..=3 {
            index
                .add(&Version::new("a", n, format!("p{}", n)))
                .await
                .unwrap();
        }

        let records = index.list("a").await.unwrap();
        let numbers: Vec<u32> = records.iter().map(|v| v.version_number).collect();
        assert_eq!(numbers, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_version_index_purge() {
        let index = MemoryVersionIndex::new();
        index.add(&Version::new("a", 1, "p1")).await.unwrap();
        index.add(&Version::new("a", 2, "p2")).await.unwrap();

        let removed = index.purge("a").await.unwrap();
        assert_eq!(removed.len(), 2);
        assert!(index.list("a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_index_orders_by_version() {
        let index = MemoryPublishIndex::new();
        for (version, publish_id) in [(2, "pub-b"), (1, "pub-a")] {
            let mut e = entity("a", version);
            e.publish_id = Some(publish_id.to_string());
            index.put(&e).await.unwrap();
        }

        let copies = index.list_for_entity("a").await.unwrap();
        let versions: Vec<u32> = copies.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![1, 2]);

        let got = index.get("pub-b").await.unwrap();
        assert_eq!(got.version, 2);
    }

    #[tokio::test]
    async fn test_publish_index_requires_publish_id() {
        let index = MemoryPublishIndex::new();
        let err = index.put(&entity("a", 1)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidParameter);
    }

    #[tokio::test]
    async fn test_workspace_lifecycle() {
        let index = MemoryWorkspaceIndex::new();
        let id = index
            .create(&Workspace::new("project-x", "alice"))
            .await
            .unwrap();
        assert!(!id.is_empty());

        let mut ws = index.retrieve(&id).await.unwrap();
        assert_eq!(ws.owner, "alice");

        ws.name = "project-y".to_string();
        index.update(&ws).await.unwrap();
        assert_eq!(index.retrieve(&id).await.unwrap().name, "project-y");
    }

    #[tokio::test]
    async fn test_audit_sink_collects() {
        let sink = MemoryAuditSink::new();
        sink.record(&AuditRecord::new(
            "a",
            "system",
            crate::domain::AuditAction::CreateEntity,
        ))
        .await
        .unwrap();

        assert_eq!(sink.records().len(), 1);
        assert_eq!(sink.records()[0].entity_id, "a");
    }
}
