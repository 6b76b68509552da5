//! Backend adapters for the storage ports.

pub mod fs;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use fs::FsBlobStore;
pub use memory::{
    MemoryAuditSink, MemoryBlobStore, MemoryIndexStore, MemoryPublishIndex, MemoryVersionIndex,
    MemoryWorkspaceIndex,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
