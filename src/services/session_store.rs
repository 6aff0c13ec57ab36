//! Session store
//!
//! Per-login key/value data kept in the cache layer under `session:{token}`.
//! The nickname shown in page headers is read from here, so profile edits
//! mirror it after the database commit.

use crate::cache::{Cache, SessionCache};
use crate::models::User;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Data remembered for a logged-in browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: i64,
    pub mobile: String,
    pub nick_name: String,
}

impl From<&User> for SessionData {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            mobile: user.mobile.clone(),
            nick_name: user.nick_name.clone(),
        }
    }
}

pub struct SessionStore {
    cache: Arc<Cache>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(cache: Arc<Cache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    fn key(token: &str) -> String {
        format!("session:{}", token)
    }

    pub async fn get(&self, token: &str) -> Result<Option<SessionData>> {
        self.cache.load(&Self::key(token)).await
    }

    pub async fn put(&self, token: &str, data: &SessionData) -> Result<()> {
        self.cache.store(&Self::key(token), data, self.ttl).await
    }

    /// Overwrite the cached nickname, seeding the entry from `user` if absent
    pub async fn set_nick_name(&self, token: &str, user: &User) -> Result<()> {
        let mut data = self
            .get(token)
            .await?
            .unwrap_or_else(|| SessionData::from(user));
        data.nick_name = user.nick_name.clone();
        self.put(token, &data).await
    }

    pub async fn remove(&self, token: &str) -> Result<()> {
        self.cache.evict(&Self::key(token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(Cache::Memory(MemoryCache::new())), Duration::from_secs(60))
    }

    fn user(nick_name: &str) -> User {
        let mut user = User::new("13800000001".into(), nick_name.into(), "hash".into());
        user.id = 3;
        user
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let store = store();
        let data = SessionData::from(&user("reader"));

        store.put("tok", &data).await.unwrap();
        assert_eq!(store.get("tok").await.unwrap(), Some(data));

        store.remove("tok").await.unwrap();
        assert!(store.get("tok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_nick_name_overwrites() {
        let store = store();
        store.put("tok", &SessionData::from(&user("old"))).await.unwrap();

        store.set_nick_name("tok", &user("Alice")).await.unwrap();

        let data = store.get("tok").await.unwrap().unwrap();
        assert_eq!(data.nick_name, "Alice");
        assert_eq!(data.user_id, 3);
    }

    #[tokio::test]
    async fn test_set_nick_name_seeds_missing_entry() {
        let store = store();
        store.set_nick_name("fresh", &user("Alice")).await.unwrap();

        let data = store.get("fresh").await.unwrap().unwrap();
        assert_eq!(data.nick_name, "Alice");
        assert_eq!(data.mobile, "13800000001");
    }
}
