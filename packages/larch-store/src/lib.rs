//! Storage layer for the larch repository: domain records, the port traits
//! the services depend on, and the backend adapters that implement them.
//!
//! # Architecture
//!
//! - [`domain`]: serializable records (entities, binaries, metadata,
//!   version pointers, workspaces, audit records)
//! - [`ports`]: async traits the service layer is written against
//! - [`infrastructure`]: in-memory, filesystem and SQLite adapters
//!
//! Current records, old-version snapshots and published copies live in
//! separate collections; an adapter never mixes them.

pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ports;

pub use error::{ErrorKind, Result, StorageError};
