//! Storage port traits
//!
//! The versioning core talks to its backends exclusively through these
//! traits; the handles are injected into service constructors (no
//! process-wide singletons). All implementations must be safe to share
//! across request tasks.

use async_trait::async_trait;

use crate::domain::{AuditRecord, Entity, Version, Workspace};
use crate::Result;

/// Authoritative store for *current* entity records, keyed by entity id.
///
/// Exactly one record per id; historical versions never live here.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Persist a new current record.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if a record with the entity's id is present.
    async fn create(&self, entity: &Entity) -> Result<String>;

    /// Replace the current record, compare-and-swap style.
    ///
    /// The write only commits if the stored record's version equals
    /// `expected_version` (the pre-image the caller read).
    ///
    /// # Errors
    ///
    /// `NotFound` if no record exists for the id; `Conflict` if the stored
    /// version differs from `expected_version`.
    async fn update(&self, entity: &Entity, expected_version: u32) -> Result<()>;

    /// Fetch the current record. Does not populate `children`.
    ///
    /// # Errors
    ///
    /// `NotFound` if no record exists for the id.
    async fn retrieve(&self, id: &str) -> Result<Entity>;

    /// Remove the current record.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Existence check without retrieval.
    async fn exists(&self, id: &str) -> Result<bool>;

    /// One page of child ids (entities whose `parent_id` equals
    /// `parent_id`), in backend-assigned order. Callers drain pages until
    /// a short page is returned.
    async fn children_of(&self, parent_id: &str, from: usize, size: usize) -> Result<Vec<String>>;
}

/// Opaque byte storage with two logical namespaces: binary content blobs
/// and serialized old-version entity snapshots.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store opaque content under a fresh locator.
    async fn create(&self, bytes: &[u8]) -> Result<String>;

    /// Fetch blob content.
    ///
    /// # Errors
    ///
    /// `NotFound` if no blob exists at `path`.
    async fn retrieve(&self, path: &str) -> Result<Vec<u8>>;

    /// Overwrite an existing blob in place. Used for binary content
    /// updates only — versioned snapshots always get a fresh path.
    ///
    /// # Errors
    ///
    /// `NotFound` if no blob exists at `path`.
    async fn update(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Remove a blob.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Serialize an entity snapshot into the old-version namespace and
    /// return its locator. Always a fresh path.
    async fn create_old_version_blob(&self, entity: &Entity) -> Result<String>;

    /// Fetch a serialized snapshot from the old-version namespace.
    ///
    /// # Errors
    ///
    /// `NotFound` if no snapshot exists at `path`.
    async fn retrieve_old_version_blob(&self, path: &str) -> Result<Vec<u8>>;

    /// Remove a snapshot blob. Only used when a deployment purges history
    /// on entity delete.
    async fn delete_old_version_blob(&self, path: &str) -> Result<()>;
}

/// Append-only log of `(entity_id, version_number) -> path` records.
#[async_trait]
pub trait VersionIndex: Send + Sync {
    /// Append a version record.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if a record for the same
    /// `(entity_id, version_number)` pair is present. The caller decides
    /// what that means: an interrupted earlier attempt already archived
    /// this pre-image, or a concurrent writer got there first.
    async fn add(&self, version: &Version) -> Result<()>;

    /// Exact-match lookup.
    ///
    /// # Errors
    ///
    /// `NotFound` if no matching record exists.
    async fn get(&self, entity_id: &str, version_number: u32) -> Result<Version>;

    /// All records for an entity, sorted by version number descending.
    async fn list(&self, entity_id: &str) -> Result<Vec<Version>>;

    /// Remove and return all records for an entity. Only used when a
    /// deployment purges history on entity delete.
    async fn purge(&self, entity_id: &str) -> Result<Vec<Version>>;
}

/// Separate index of published entity copies, keyed by publish id.
#[async_trait]
pub trait PublishIndex: Send + Sync {
    /// Store a published copy. The entity must carry a publish id.
    async fn put(&self, entity: &Entity) -> Result<()>;

    /// Fetch a published copy by publish id.
    ///
    /// # Errors
    ///
    /// `NotFound` if no copy exists for the publish id.
    async fn get(&self, publish_id: &str) -> Result<Entity>;

    /// All published copies of an entity, ordered ascending by the version
    /// captured at publish time.
    async fn list_for_entity(&self, entity_id: &str) -> Result<Vec<Entity>>;
}

/// Store for workspaces, independent of the entity lifecycle.
#[async_trait]
pub trait WorkspaceIndex: Send + Sync {
    async fn create(&self, workspace: &Workspace) -> Result<String>;

    /// # Errors
    ///
    /// `NotFound` if no workspace exists for the id.
    async fn retrieve(&self, id: &str) -> Result<Workspace>;

    /// # Errors
    ///
    /// `NotFound` if no workspace exists for the id.
    async fn update(&self, workspace: &Workspace) -> Result<()>;
}

/// Fire-and-forget audit notifications. Failures are logged by the caller
/// and never propagated into the mutation result.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: &AuditRecord) -> Result<()>;
}
