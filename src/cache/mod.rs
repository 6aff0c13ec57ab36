//! Session cache backends
//!
//! Logged-in browsers are tracked as small JSON records stored under
//! `session:{token}` and expiring together with the login. Two backends:
//! - `memory`: moka inside the process, lost on restart
//! - `redis`: shared by every instance behind a load balancer, needs the
//!   `redis-cache` feature
//!
//! `cache.driver` in `config.yml` picks one at startup.

pub mod memory;
#[cfg(feature = "redis-cache")]
pub mod redis;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CacheConfig, CacheDriver};

pub use memory::MemoryCache;
#[cfg(feature = "redis-cache")]
pub use redis::RedisCache;

/// Expiring JSON records keyed by string.
///
/// Generic methods keep this out of `dyn`; dispatch goes through [`Cache`].
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Read a record. Expired and missing keys both give `None`.
    async fn load<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Write a record that disappears after `ttl`. Rewriting a key restarts its clock.
    async fn store<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    /// Drop a record; unknown keys are ignored
    async fn evict(&self, key: &str) -> Result<()>;
}

/// Backend selected from configuration
#[derive(Debug)]
pub enum Cache {
    Memory(MemoryCache),
    #[cfg(feature = "redis-cache")]
    Redis(RedisCache),
}

#[async_trait]
impl SessionCache for Cache {
    async fn load<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self {
            Cache::Memory(backend) => backend.load(key).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(backend) => backend.load(key).await,
        }
    }

    async fn store<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        match self {
            Cache::Memory(backend) => backend.store(key, value, ttl).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(backend) => backend.store(key, value, ttl).await,
        }
    }

    async fn evict(&self, key: &str) -> Result<()> {
        match self {
            Cache::Memory(backend) => backend.evict(key).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(backend) => backend.evict(key).await,
        }
    }
}

/// Build the session cache named by `cache.driver`
pub async fn create_cache(config: &CacheConfig) -> Result<Arc<Cache>> {
    let cache = match config.driver {
        CacheDriver::Memory => Cache::Memory(MemoryCache::with_capacity(config.max_entries)),
        CacheDriver::Redis => connect_redis(config).await?,
    };
    Ok(Arc::new(cache))
}

#[cfg(feature = "redis-cache")]
async fn connect_redis(config: &CacheConfig) -> Result<Cache> {
    let Some(url) = config.redis_url.as_deref() else {
        anyhow::bail!(
            "cache.driver is redis but no redis_url is set (config.yml or NEWSDESK_CACHE_REDIS_URL)"
        );
    };
    let backend = RedisCache::connect(url, &config.key_prefix).await?;
    Ok(Cache::Redis(backend))
}

#[cfg(not(feature = "redis-cache"))]
async fn connect_redis(_config: &CacheConfig) -> Result<Cache> {
    anyhow::bail!("cache.driver is redis but this build lacks the `redis-cache` feature; use the memory driver")
}
