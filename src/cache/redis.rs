//! Redis session cache
//!
//! Every key is namespaced with `cache.key_prefix` so several deployments can
//! share one Redis database. Records are JSON strings written with `PSETEX`.

use super::SessionCache;
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

pub struct RedisCache {
    connection: MultiplexedConnection,
    prefix: String,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Open a multiplexed connection; keys are written as `{prefix}{key}`
    pub async fn connect(url: &str, prefix: &str) -> Result<Self> {
        let client = Client::open(url).with_context(|| format!("Invalid Redis URL {}", url))?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .context("Could not reach Redis for the session cache")?;

        Ok(Self {
            connection,
            prefix: prefix.to_string(),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl SessionCache for RedisCache {
    async fn load<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn
            .get(self.namespaced(key))
            .await
            .with_context(|| format!("Redis GET {} failed", key))?;

        raw.map(|json| serde_json::from_str(&json).with_context(|| format!("Corrupt session record {}", key)))
            .transpose()
    }

    async fn store<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(value).context("Failed to encode session record")?;
        // PSETEX rejects a zero expiry
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        let mut conn = self.connection.clone();
        let _: () = conn
            .pset_ex(self.namespaced(key), json, millis)
            .await
            .with_context(|| format!("Redis PSETEX {} failed", key))?;
        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .del(self.namespaced(key))
            .await
            .with_context(|| format!("Redis DEL {} failed", key))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::SessionData;

    async fn connect() -> RedisCache {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        RedisCache::connect(&url, "newsdesk-test:")
            .await
            .expect("Failed to connect to Redis")
    }

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn test_session_record_lifecycle() {
        let cache = connect().await;
        let record = SessionData {
            user_id: 9,
            mobile: "13800000009".into(),
            nick_name: "editor".into(),
        };

        cache.store("session:redis", &record, Duration::from_secs(60)).await.unwrap();
        let found: Option<SessionData> = cache.load("session:redis").await.unwrap();
        assert_eq!(found, Some(record));

        cache.evict("session:redis").await.unwrap();
        let gone: Option<SessionData> = cache.load("session:redis").await.unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn test_session_record_expires() {
        let cache = connect().await;
        cache
            .store("session:short", &"x".to_string(), Duration::from_millis(50))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        let gone: Option<String> = cache.load("session:short").await.unwrap();
        assert!(gone.is_none());
    }
}
