//! Object storage gateway
//!
//! Uploaded images are stored under a content-addressed key (the SHA-256 of
//! the bytes). Callers turn a key into a public URL by prepending the
//! configured domain prefix.

pub mod local;
pub mod remote;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{StorageConfig, StorageDriver};

pub use local::LocalStorage;
pub use remote::RemoteStorage;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Refusing to store an empty file")]
    Empty,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Object store rejected upload with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Storage misconfigured: {0}")]
    Config(String),
}

/// A blob store that hands back a key for each upload
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` and return its key
    async fn upload(&self, data: Vec<u8>, content_type: &str) -> Result<String, StorageError>;
}

/// Lowercase hex SHA-256 of the content
pub fn content_key(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Build the storage backend selected in configuration
pub fn create_storage(config: &StorageConfig) -> Result<Arc<dyn ObjectStorage>, StorageError> {
    match config.driver {
        StorageDriver::Local => Ok(Arc::new(LocalStorage::new(config.local_path.clone()))),
        StorageDriver::Remote => Ok(Arc::new(RemoteStorage::from_config(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_key_is_sha256_hex() {
        assert_eq!(
            content_key(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(content_key(b"").len(), 64);
    }

    #[test]
    fn test_create_remote_without_endpoint_fails() {
        let config = StorageConfig {
            driver: StorageDriver::Remote,
            ..StorageConfig::default()
        };
        assert!(matches!(create_storage(&config), Err(StorageError::Config(_))));
    }

    #[test]
    fn test_create_local_storage() {
        assert!(create_storage(&StorageConfig::default()).is_ok());
    }
}
