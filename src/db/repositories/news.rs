//! News repository
//!
//! Database operations for news items.
//!
//! This module provides:
//! - `NewsRepository` trait defining the interface for news data access
//! - `SqlxNewsRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, News, NewsStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

pub(crate) const NEWS_COLUMNS: &str = "n.id, n.title, n.source, n.digest, n.content, n.clicks, \
     n.index_image_url, n.category_id, n.user_id, n.status, n.reason, n.created_at, n.updated_at";

const INSERT_NEWS: &str = r#"
    INSERT INTO news (title, source, digest, content, clicks, index_image_url, category_id, user_id, status, reason, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

/// News repository trait
#[async_trait]
pub trait NewsRepository: Send + Sync {
    /// Insert a news item in one transaction
    async fn create(&self, news: &News) -> Result<News>;

    /// Get news by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<News>>;

    /// Count the news authored by a user
    async fn count_by_author(&self, user_id: i64) -> Result<i64>;

    /// One page of a user's news, newest first
    async fn list_by_author(&self, user_id: i64, params: &ListParams) -> Result<Vec<News>>;
}

/// SQLx-based news repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxNewsRepository {
    pool: DynDatabasePool,
}

impl SqlxNewsRepository {
    /// Create a new SQLx news repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NewsRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NewsRepository for SqlxNewsRepository {
    async fn create(&self, news: &News) -> Result<News> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_news_sqlite(self.pool.sqlite()?, news).await,
            DatabaseDriver::Mysql => create_news_mysql(self.pool.mysql()?, news).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<News>> {
        let sql = format!("SELECT {} FROM news n WHERE n.id = ?", NEWS_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get news by ID")?;
                row.as_ref().map(row_to_news_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get news by ID")?;
                row.as_ref().map(row_to_news_mysql).transpose()
            }
        }
    }

    async fn count_by_author(&self, user_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) as count FROM news WHERE user_id = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(user_id)
                    .fetch_one(self.pool.sqlite()?)
                    .await
                    .context("Failed to count news by author")?;
                row.get("count")
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(user_id)
                    .fetch_one(self.pool.mysql()?)
                    .await
                    .context("Failed to count news by author")?;
                row.get("count")
            }
        };
        Ok(count)
    }

    async fn list_by_author(&self, user_id: i64, params: &ListParams) -> Result<Vec<News>> {
        let sql = format!(
            "SELECT {} FROM news n WHERE n.user_id = ? ORDER BY n.created_at DESC, n.id DESC LIMIT ? OFFSET ?",
            NEWS_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(user_id)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(self.pool.sqlite()?)
                .await
                .context("Failed to list news by author")?
                .iter()
                .map(row_to_news_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(user_id)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(self.pool.mysql()?)
                .await
                .context("Failed to list news by author")?
                .iter()
                .map(row_to_news_mysql)
                .collect(),
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_news_sqlite(pool: &SqlitePool, news: &News) -> Result<News> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(INSERT_NEWS)
        .bind(&news.title)
        .bind(&news.source)
        .bind(&news.digest)
        .bind(&news.content)
        .bind(news.clicks)
        .bind(&news.index_image_url)
        .bind(news.category_id)
        .bind(news.user_id)
        .bind(news.status.as_i32())
        .bind(&news.reason)
        .bind(news.created_at)
        .bind(news.updated_at)
        .execute(&mut *tx)
        .await;

    let id = match result {
        Ok(done) => done.last_insert_rowid(),
        Err(e) => {
            tx.rollback().await.context("Failed to roll back news insert")?;
            return Err(e).context("Failed to create news");
        }
    };
    tx.commit().await.context("Failed to commit news insert")?;

    Ok(News { id, ..news.clone() })
}

pub(crate) fn row_to_news_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<News> {
    let status_code: i32 = row.get("status");
    let status = NewsStatus::from_i32(status_code)
        .with_context(|| format!("Invalid news status in database: {}", status_code))?;

    Ok(News {
        id: row.get("id"),
        title: row.get("title"),
        source: row.get("source"),
        digest: row.get("digest"),
        content: row.get("content"),
        clicks: row.get("clicks"),
        index_image_url: row.get("index_image_url"),
        category_id: row.get("category_id"),
        user_id: row.get("user_id"),
        status,
        reason: row.get("reason"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_news_mysql(pool: &MySqlPool, news: &News) -> Result<News> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(INSERT_NEWS)
        .bind(&news.title)
        .bind(&news.source)
        .bind(&news.digest)
        .bind(&news.content)
        .bind(news.clicks)
        .bind(&news.index_image_url)
        .bind(news.category_id)
        .bind(news.user_id)
        .bind(news.status.as_i32())
        .bind(&news.reason)
        .bind(news.created_at)
        .bind(news.updated_at)
        .execute(&mut *tx)
        .await;

    let id = match result {
        Ok(done) => done.last_insert_id() as i64,
        Err(e) => {
            tx.rollback().await.context("Failed to roll back news insert")?;
            return Err(e).context("Failed to create news");
        }
    };
    tx.commit().await.context("Failed to commit news insert")?;

    Ok(News { id, ..news.clone() })
}

pub(crate) fn row_to_news_mysql(row: &sqlx::mysql::MySqlRow) -> Result<News> {
    let status_code: i32 = row.get("status");
    let status = NewsStatus::from_i32(status_code)
        .with_context(|| format!("Invalid news status in database: {}", status_code))?;

    Ok(News {
        id: row.get("id"),
        title: row.get("title"),
        source: row.get("source"),
        digest: row.get("digest"),
        content: row.get("content"),
        clicks: row.get::<i32, _>("clicks") as i64,
        index_image_url: row.get("index_image_url"),
        category_id: row.get("category_id"),
        user_id: row.get("user_id"),
        status,
        reason: row.get("reason"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
