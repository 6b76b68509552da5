//! SQLite adapter for the index, version and publish ports.
//!
//! One connection behind a mutex serves all three collections; records are
//! stored as JSON documents next to the columns needed for lookups. The
//! compare-and-swap on `update` is a single
//! `UPDATE ... WHERE id = ?1 AND version = ?2` checked by affected rows.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::domain::{Entity, Version};
use crate::ports::{IndexStore, PublishIndex, VersionIndex};
use crate::{Result, StorageError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS entities (
    id        TEXT PRIMARY KEY,
    version   INTEGER NOT NULL,
    parent_id TEXT,
    doc       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_entities_parent ON entities (parent_id);

CREATE TABLE IF NOT EXISTS versions (
    entity_id      TEXT NOT NULL,
    version_number INTEGER NOT NULL,
    path           TEXT NOT NULL,
    PRIMARY KEY (entity_id, version_number)
);

CREATE TABLE IF NOT EXISTS published (
    publish_id TEXT PRIMARY KEY,
    entity_id  TEXT NOT NULL,
    version    INTEGER NOT NULL,
    doc        TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_published_entity ON published (entity_id);
";

/// SQLite-backed store implementing [`IndexStore`], [`VersionIndex`] and
/// [`PublishIndex`] over one connection.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (and migrate) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn encode(entity: &Entity) -> Result<String> {
        Ok(serde_json::to_string(entity)?)
    }

    fn decode(doc: &str) -> Result<Entity> {
        Ok(serde_json::from_str(doc)?)
    }
}

#[async_trait]
impl IndexStore for SqliteStore {
    async fn create(&self, entity: &Entity) -> Result<String> {
        let doc = Self::encode(entity)?;
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO entities (id, version, parent_id, doc) VALUES (?1, ?2, ?3, ?4)",
            params![entity.id, entity.version, entity.parent_id, doc],
        )?;
        if inserted == 0 {
            return Err(StorageError::already_exists(format!(
                "Entity with id {} already exists",
                entity.id
            )));
        }
        debug!("created entity record {}", entity.id);
        Ok(entity.id.clone())
    }

    async fn update(&self, entity: &Entity, expected_version: u32) -> Result<()> {
        let doc = Self::encode(entity)?;
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE entities SET version = ?1, parent_id = ?2, doc = ?3
             WHERE id = ?4 AND version = ?5",
            params![entity.version, entity.parent_id, doc, entity.id, expected_version],
        )?;
        if updated == 1 {
            return Ok(());
        }
        let current: Option<u32> = conn
            .query_row(
                "SELECT version FROM entities WHERE id = ?1",
                params![entity.id],
                |row| row.get(0),
            )
            .optional()?;
        match current {
            Some(found) => Err(StorageError::conflict(format!(
                "Entity {} expected version {}, found {}",
                entity.id, expected_version, found
            ))),
            None => Err(StorageError::not_found(format!(
                "Entity with id {} not found",
                entity.id
            ))),
        }
    }

    async fn retrieve(&self, id: &str) -> Result<Entity> {
        let conn = self.conn.lock();
        let doc: Option<String> = conn
            .query_row(
                "SELECT doc FROM entities WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match doc {
            Some(doc) => Self::decode(&doc),
            None => Err(StorageError::not_found(format!(
                "Entity with id {} not found",
                id
            ))),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM entities WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StorageError::not_found(format!(
                "Entity with id {} not found",
                id
            )));
        }
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM entities WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    async fn children_of(&self, parent_id: &str, from: usize, size: usize) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id FROM entities WHERE parent_id = ?1 ORDER BY id LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt.query_map(params![parent_id, size as i64, from as i64], |row| {
            row.get::<_, String>(0)
        })?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }
}

#[async_trait]
impl VersionIndex for SqliteStore {
    async fn add(&self, version: &Version) -> Result<()> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO versions (entity_id, version_number, path) VALUES (?1, ?2, ?3)",
            params![version.entity_id, version.version_number, version.path],
        )?;
        if inserted == 0 {
            return Err(StorageError::already_exists(format!(
                "Version record for entity {} version {} already exists",
                version.entity_id, version.version_number
            )));
        }
        debug!(
            "added version record {} / {}",
            version.entity_id, version.version_number
        );
        Ok(())
    }

    async fn get(&self, entity_id: &str, version_number: u32) -> Result<Version> {
        let conn = self.conn.lock();
        let path: Option<String> = conn
            .query_row(
                "SELECT path FROM versions WHERE entity_id = ?1 AND version_number = ?2",
                params![entity_id, version_number],
                |row| row.get(0),
            )
            .optional()?;
        match path {
            Some(path) => Ok(Version::new(entity_id, version_number, path)),
            None => Err(StorageError::not_found(format!(
                "Entity {} does not exist with version {}",
                entity_id, version_number
            ))),
        }
    }

    async fn list(&self, entity_id: &str) -> Result<Vec<Version>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT version_number, path FROM versions
             WHERE entity_id = ?1 ORDER BY version_number DESC",
        )?;
        let rows = stmt.query_map(params![entity_id], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut records = Vec::new();
        for row in rows {
            let (version_number, path) = row?;
            records.push(Version::new(entity_id, version_number, path));
        }
        Ok(records)
    }

    async fn purge(&self, entity_id: &str) -> Result<Vec<Version>> {
        let records = self.list(entity_id).await?;
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM versions WHERE entity_id = ?1",
            params![entity_id],
        )?;
        Ok(records)
    }
}

#[async_trait]
impl PublishIndex for SqliteStore {
    async fn put(&self, entity: &Entity) -> Result<()> {
        let publish_id = entity.publish_id.as_deref().ok_or_else(|| {
            StorageError::invalid_parameter("Published entity carries no publish id")
        })?;
        let doc = Self::encode(entity)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO published (publish_id, entity_id, version, doc)
             VALUES (?1, ?2, ?3, ?4)",
            params![publish_id, entity.id, entity.version, doc],
        )?;
        Ok(())
    }

    async fn get(&self, publish_id: &str) -> Result<Entity> {
        let conn = self.conn.lock();
        let doc: Option<String> = conn
            .query_row(
                "SELECT doc FROM published WHERE publish_id = ?1",
                params![publish_id],
                |row| row.get(0),
            )
            .optional()?;
        match doc {
            Some(doc) => Self::decode(&doc),
            None => Err(StorageError::not_found(format!(
                "No published entity for publish id {}",
                publish_id
            ))),
        }
    }

    async fn list_for_entity(&self, entity_id: &str) -> Result<Vec<Entity>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT doc FROM published WHERE entity_id = ?1 ORDER BY version ASC",
        )?;
        let rows = stmt.query_map(params![entity_id], |row| row.get::<_, String>(0))?;
        let mut copies = Vec::new();
        for row in rows {
            copies.push(Self::decode(&row?)?);
        }
        Ok(copies)
    }
}
