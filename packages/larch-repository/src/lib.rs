//! Versioning core of the larch repository.
//!
//! [`EntityService`] drives the lifecycle of versioned entities over the
//! storage ports from `larch-store`: every mutation archives the current
//! record as a durable snapshot before writing its successor, so the full
//! version history of an entity stays retrievable. [`PublishService`]
//! maintains the separate index of published copies and [`VersionStore`]
//! the snapshot archive.
//!
//! Store handles are injected into the service constructors; nothing here
//! holds process-wide state.

pub mod config;
pub mod error;
pub mod patch;
pub mod publish;
pub mod service;
pub mod versions;

pub use config::RepositoryConfig;
pub use error::{RepositoryError, Result};
pub use patch::EntityPatch;
pub use publish::PublishService;
pub use service::EntityService;
pub use versions::VersionStore;
