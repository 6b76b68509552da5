//! Filesystem blob store.
//!
//! Blobs live under two sibling namespaces below one root: `data/` for
//! binary content and `versions/` for serialized old-version entity
//! snapshots. A blob path is `<two-char fan-out folder>/<16-char name>`,
//! generated randomly and retried until an unused name is found.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::domain::Entity;
use crate::ports::BlobStore;
use crate::{Result, StorageError};

const DATA_DIR: &str = "data";
const OLD_VERSION_DIR: &str = "versions";

/// Blob store on a local filesystem.
pub struct FsBlobStore {
    data_dir: PathBuf,
    old_version_dir: PathBuf,
}

impl FsBlobStore {
    /// Open (and create if needed) the blob directories below `root`.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let data_dir = root.as_ref().join(DATA_DIR);
        let old_version_dir = root.as_ref().join(OLD_VERSION_DIR);
        tokio::fs::create_dir_all(&data_dir).await?;
        tokio::fs::create_dir_all(&old_version_dir).await?;
        Ok(Self {
            data_dir,
            old_version_dir,
        })
    }

    /// Pick an unused `folder/name` path below `base`, creating the fan-out
    /// folder. Collisions are vanishingly rare but the contract loops.
    async fn fresh_path(base: &Path) -> Result<(String, PathBuf)> {
        loop {
            let hex = Uuid::new_v4().simple().to_string();
            let folder = &hex[..2];
            let name = &hex[2..18];
            let folder_path = base.join(folder);
            tokio::fs::create_dir_all(&folder_path).await?;
            let file_path = folder_path.join(name);
            if !tokio::fs::try_exists(&file_path).await? {
                return Ok((format!("{}/{}", folder, name), file_path));
            }
        }
    }

    fn resolve(&self, base: &Path, path: &str) -> Result<PathBuf> {
        // A locator is exactly "xx/yyyy..."; anything else (absolute paths,
        // parent traversal) is rejected.
        let mut parts = path.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(folder), Some(name), None)
                if !folder.is_empty()
                    && !name.is_empty()
                    && folder.chars().all(char::is_alphanumeric)
                    && name.chars().all(char::is_alphanumeric) =>
            {
                Ok(base.join(folder).join(name))
            }
            _ => Err(StorageError::invalid_parameter(format!(
                "Invalid blob path: {}",
                path
            ))),
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn create(&self, bytes: &[u8]) -> Result<String> {
        let (path, file_path) = Self::fresh_path(&self.data_dir).await?;
        debug!("creating blob at {}", file_path.display());
        tokio::fs::write(&file_path, bytes).await?;
        Ok(path)
    }

    async fn retrieve(&self, path: &str) -> Result<Vec<u8>> {
        let file_path = self.resolve(&self.data_dir, path)?;
        Ok(tokio::fs::read(&file_path).await?)
    }

    async fn update(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let file_path = self.resolve(&self.data_dir, path)?;
        if !tokio::fs::try_exists(&file_path).await? {
            return Err(StorageError::not_found(format!(
                "{} can not be updated since it does not exist",
                path
            )));
        }
        tokio::fs::write(&file_path, bytes).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let file_path = self.resolve(&self.data_dir, path)?;
        tokio::fs::remove_file(&file_path).await?;
        Ok(())
    }

    async fn create_old_version_blob(&self, entity: &Entity) -> Result<String> {
        let bytes = serde_json::to_vec(entity)?;
        let (path, file_path) = Self::fresh_path(&self.old_version_dir).await?;
        debug!("creating snapshot blob at {}", file_path.display());
        tokio::fs::write(&file_path, &bytes).await?;
        Ok(path)
    }

    async fn retrieve_old_version_blob(&self, path: &str) -> Result<Vec<u8>> {
        let file_path = self.resolve(&self.old_version_dir, path)?;
        Ok(tokio::fs::read(&file_path).await?)
    }

    async fn delete_old_version_blob(&self, path: &str) -> Result<()> {
        let file_path = self.resolve(&self.old_version_dir, path)?;
        tokio::fs::remove_file(&file_path).await?;
        Ok(())
    }
}
