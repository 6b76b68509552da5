//! Domain layer for the larch repository core
//!
//! # Domain Models
//!
//! - `Entity`: versioned repository object (metadata, binaries, relations)
//! - `Binary`: content stream attached to an entity
//! - `Metadata`: named payload attached to an entity or binary
//! - `Version`: append-only index record pointing at a historical snapshot blob
//! - `Workspace`: named permission scope over entities
//! - `AuditRecord`: best-effort record of a successful mutation
//!
//! # Versioning rules
//!
//! For a given entity id exactly one *current* record exists in the index
//! store; every prior version lives only as a snapshot blob referenced by a
//! `Version` record. Version numbers form a contiguous sequence starting at
//! 1. `utc_created` never changes across versions; `utc_last_modified` is
//! strictly later on each successive version.

mod audit;
mod binary;
mod entity;
mod identifier;
mod metadata;
mod version;
mod workspace;

pub use audit::{AuditAction, AuditRecord};
pub use binary::Binary;
pub use entity::{Entity, EntityState};
pub use identifier::{AlternativeIdentifier, IdentifierType};
pub use metadata::Metadata;
pub use version::Version;
pub use workspace::{Permission, Workspace, WorkspacePermissions};
