//! Publishing behavior: published copies are independent snapshots in
//! their own index, created through the normal versioned update path.

use std::sync::Arc;

use larch_repository::{EntityService, PublishService, RepositoryConfig, VersionStore};
use larch_store::domain::{Entity, EntityState};
use larch_store::infrastructure::{
    MemoryAuditSink, MemoryBlobStore, MemoryIndexStore, MemoryPublishIndex, MemoryVersionIndex,
    MemoryWorkspaceIndex,
};
use larch_store::ErrorKind;

fn service() -> EntityService {
    let blobs = Arc::new(MemoryBlobStore::new());
    EntityService::new(
        Arc::new(MemoryIndexStore::new()),
        blobs.clone(),
        VersionStore::new(blobs, Arc::new(MemoryVersionIndex::new())),
        PublishService::new(Arc::new(MemoryPublishIndex::new())),
        Arc::new(MemoryWorkspaceIndex::new()),
        Arc::new(MemoryAuditSink::new()),
        RepositoryConfig::default(),
    )
}

#[tokio::test]
async fn test_publish_bumps_version_and_state() {
    let service = service();
    let id = service.create(Entity::new("Book A")).await.unwrap();

    let publish_id = service.publish(&id).await.unwrap();

    let current = service.retrieve(&id).await.unwrap();
    assert_eq!(current.version, 2);
    assert_eq!(current.state, EntityState::Published);
    assert_eq!(current.publish_id.as_deref(), Some(publish_id.as_str()));

    // The pre-publish version is archived like any other pre-image.
    let v1 = service.retrieve_version(&id, 1).await.unwrap();
    assert_eq!(v1.state, EntityState::Ingested);
    assert!(v1.publish_id.is_none());
}

#[tokio::test]
async fn test_published_copy_is_a_snapshot() {
    let service = service();
    let id = service.create(Entity::new("Book A")).await.unwrap();
    let publish_id = service.publish(&id).await.unwrap();

    // Later edits do not touch the published copy.
    let mut entity = service.retrieve(&id).await.unwrap();
    entity.label = "Book A, revised".to_string();
    service.update(entity).await.unwrap();

    let copy = service.retrieve_published(&publish_id).await.unwrap();
    assert_eq!(copy.label, "Book A");
    assert_eq!(copy.version, 2);
    assert_eq!(copy.state, EntityState::Published);
}

#[tokio::test]
async fn test_repeated_publishes_yield_distinct_snapshots() {
    let service = service();
    let id = service.create(Entity::new("Book A")).await.unwrap();

    let first = service.publish(&id).await.unwrap();
    let second = service.publish(&id).await.unwrap();
    assert_ne!(first, second);

    let copies = service.published_versions(&id).await.unwrap();
    assert_eq!(copies.len(), 2);
    let versions: Vec<u32> = copies.iter().map(|e| e.version).collect();
    assert_eq!(versions, vec![2, 3]);

    let ids: Vec<&str> = copies
        .iter()
        .map(|e| e.publish_id.as_deref().unwrap())
        .collect();
    assert_eq!(ids, vec![first.as_str(), second.as_str()]);
}

#[tokio::test]
async fn test_unknown_publish_id() {
    let service = service();
    let err = service.retrieve_published("nope").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_unpublished_entity_has_no_copies() {
    let service = service();
    let id = service.create(Entity::new("Book A")).await.unwrap();

    let err = service.published_versions(&id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_publish_nonexistent_entity() {
    let service = service();
    let err = service.publish("ghost").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
