//! In-process session cache on moka
//!
//! Each record keeps the TTL it was written with, so sessions created with
//! different lifetimes expire independently.

use super::SessionCache;
use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use moka::Expiry;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Entry bound when no capacity is configured
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

#[derive(Clone)]
struct Record {
    json: Arc<str>,
    ttl: Duration,
}

/// Expiry policy that reads the TTL off the record itself
struct RecordTtl;

impl Expiry<String, Record> for RecordTtl {
    fn expire_after_create(&self, _key: &String, record: &Record, _created_at: Instant) -> Option<Duration> {
        Some(record.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        record: &Record,
        _updated_at: Instant,
        _remaining: Option<Duration>,
    ) -> Option<Duration> {
        Some(record.ttl)
    }
}

pub struct MemoryCache {
    records: MokaCache<String, Record>,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("records", &self.records.entry_count())
            .finish()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    /// Bound the number of live sessions; the least recently used go first
    pub fn with_capacity(max_entries: u64) -> Self {
        let records = MokaCache::builder()
            .max_capacity(max_entries)
            .expire_after(RecordTtl)
            .build();
        Self { records }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionCache for MemoryCache {
    async fn load<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        let Some(record) = self.records.get(key).await else {
            return Ok(None);
        };
        let value = serde_json::from_str(&record.json).with_context(|| format!("Corrupt session record {}", key))?;
        Ok(Some(value))
    }

    async fn store<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(value).context("Failed to encode session record")?;
        let record = Record {
            json: Arc::from(json),
            ttl,
        };
        self.records.insert(key.to_string(), record).await;
        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<()> {
        self.records.invalidate(key).await;
        Ok(())
    }
}
