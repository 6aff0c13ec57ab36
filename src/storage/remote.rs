//! Remote HTTP object store
//!
//! Uploads with `PUT {endpoint}/{bucket}/{key}`, authenticated with a
//! bearer token when one is configured.

use super::{content_key, ObjectStorage, StorageError};
use crate::config::StorageConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub struct RemoteStorage {
    http_client: Client,
    endpoint: String,
    bucket: Option<String>,
    access_token: Option<String>,
}

impl RemoteStorage {
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| StorageError::Config("remote storage requires an endpoint".into()))?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        tracing::info!("Remote object storage at {}", endpoint);

        Ok(Self {
            http_client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            access_token: config.access_token.clone(),
        })
    }

    /// URL an object with `key` is PUT to
    pub fn object_url(&self, key: &str) -> String {
        match &self.bucket {
            Some(bucket) => format!("{}/{}/{}", self.endpoint, bucket, key),
            None => format!("{}/{}", self.endpoint, key),
        }
    }
}

#[async_trait]
impl ObjectStorage for RemoteStorage {
    async fn upload(&self, data: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        if data.is_empty() {
            return Err(StorageError::Empty);
        }

        let key = content_key(&data);
        let size = data.len();
        tracing::debug!("Uploading {} ({} bytes) to object store", key, size);

        let mut request = self
            .http_client
            .put(self.object_url(&key))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected { status, body });
        }

        tracing::info!("Uploaded {} ({} bytes) to object store", key, size);
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageDriver;

    fn config(bucket: Option<&str>) -> StorageConfig {
        StorageConfig {
            driver: StorageDriver::Remote,
            endpoint: Some("http://store.example.com/".to_string()),
            bucket: bucket.map(str::to_string),
            ..StorageConfig::default()
        }
    }

    #[test]
    fn test_object_url_with_bucket() {
        let storage = RemoteStorage::from_config(&config(Some("avatars"))).unwrap();
        assert_eq!(storage.object_url("abc"), "http://store.example.com/avatars/abc");
    }

    #[test]
    fn test_object_url_without_bucket() {
        let storage = RemoteStorage::from_config(&config(None)).unwrap();
        assert_eq!(storage.object_url("abc"), "http://store.example.com/abc");
    }

    #[tokio::test]
    async fn test_unreachable_store_is_http_error() {
        let mut cfg = config(None);
        cfg.endpoint = Some("http://127.0.0.1:9".to_string());
        cfg.timeout_seconds = 2;
        let storage = RemoteStorage::from_config(&cfg).unwrap();

        let result = storage.upload(b"x".to_vec(), "image/png").await;
        assert!(matches!(result, Err(StorageError::Http(_))));
    }
}
