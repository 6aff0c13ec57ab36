//! Local directory storage
//!
//! Files are written under a root directory and served by the router at the
//! configured domain prefix.

use super::{content_key, ObjectStorage, StorageError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(&self, data: Vec<u8>, _content_type: &str) -> Result<String, StorageError> {
        if data.is_empty() {
            return Err(StorageError::Empty);
        }

        let key = content_key(&data);
        let path = self.root.join(&key);

        // Same key means same bytes
        if tokio::fs::try_exists(&path).await? {
            tracing::debug!("Upload {} already stored", key);
            return Ok(key);
        }

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, &data).await?;
        tracing::info!("Stored upload {} ({} bytes)", key, data.len());

        Ok(key)
    }
}
