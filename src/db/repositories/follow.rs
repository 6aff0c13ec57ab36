//! Follow repository
//!
//! The self-referential "user follows user" relation, stored in the
//! `user_follows` join table.

use crate::config::DatabaseDriver;
use crate::db::repositories::user::{row_to_user_mysql, row_to_user_sqlite, USER_COLUMNS};
use crate::db::DynDatabasePool;
use crate::models::{ListParams, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Follow repository trait
#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Record that `follower_id` follows `followed_id`. Following twice is a no-op.
    async fn follow(&self, follower_id: i64, followed_id: i64) -> Result<()>;

    /// Number of users `user_id` follows
    async fn count_followed(&self, user_id: i64) -> Result<i64>;

    /// One page of the users `user_id` follows, most recently followed first
    async fn list_followed(&self, user_id: i64, params: &ListParams) -> Result<Vec<User>>;

    /// Number of users following `user_id`
    async fn count_followers(&self, user_id: i64) -> Result<i64>;
}

/// SQLx-based follow repository implementation
pub struct SqlxFollowRepository {
    pool: DynDatabasePool,
}

impl SqlxFollowRepository {
    /// Create a new SQLx follow repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FollowRepository> {
        Arc::new(Self::new(pool))
    }

    async fn count(&self, sql: &str, user_id: i64) -> Result<i64> {
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(user_id)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to count follows")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(user_id)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to count follows")?
                .get("count"),
        };
        Ok(count)
    }
}

#[async_trait]
impl FollowRepository for SqlxFollowRepository {
    async fn follow(&self, follower_id: i64, followed_id: i64) -> Result<()> {
        let now = Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(
                    "INSERT OR IGNORE INTO user_follows (follower_id, followed_id, created_at) VALUES (?, ?, ?)",
                )
                .bind(follower_id)
                .bind(followed_id)
                .bind(now)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to follow user")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(
                    "INSERT IGNORE INTO user_follows (follower_id, followed_id, created_at) VALUES (?, ?, ?)",
                )
                .bind(follower_id)
                .bind(followed_id)
                .bind(now)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to follow user")?;
            }
        }
        Ok(())
    }

    async fn count_followed(&self, user_id: i64) -> Result<i64> {
        self.count("SELECT COUNT(*) as count FROM user_follows WHERE follower_id = ?", user_id)
            .await
    }

    async fn list_followed(&self, user_id: i64, params: &ListParams) -> Result<Vec<User>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM users u
            INNER JOIN user_follows f ON f.followed_id = u.id
            WHERE f.follower_id = ?
            ORDER BY f.created_at DESC, u.id DESC
            LIMIT ? OFFSET ?
            "#,
            USER_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(user_id)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(self.pool.sqlite()?)
                .await
                .context("Failed to list followed users")?
                .iter()
                .map(row_to_user_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(user_id)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(self.pool.mysql()?)
                .await
                .context("Failed to list followed users")?
                .iter()
                .map(row_to_user_mysql)
                .collect(),
        }
    }

    async fn count_followers(&self, user_id: i64) -> Result<i64> {
        self.count("SELECT COUNT(*) as count FROM user_follows WHERE followed_id = ?", user_id)
            .await
    }
}
