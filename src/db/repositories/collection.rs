//! Collection repository
//!
//! News a user has bookmarked, stored in the `user_collections` join table.

use crate::config::DatabaseDriver;
use crate::db::repositories::news::{row_to_news_mysql, row_to_news_sqlite, NEWS_COLUMNS};
use crate::db::DynDatabasePool;
use crate::models::{ListParams, News};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Collection repository trait
#[async_trait]
pub trait CollectionRepository: Send + Sync {
    /// Bookmark a news item. Collecting twice is a no-op.
    async fn collect(&self, user_id: i64, news_id: i64) -> Result<()>;

    /// Number of news items the user has collected
    async fn count_collected(&self, user_id: i64) -> Result<i64>;

    /// One page of collected news, most recently collected first
    async fn list_collected(&self, user_id: i64, params: &ListParams) -> Result<Vec<News>>;
}

/// SQLx-based collection repository implementation
pub struct SqlxCollectionRepository {
    pool: DynDatabasePool,
}

impl SqlxCollectionRepository {
    /// Create a new SQLx collection repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CollectionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CollectionRepository for SqlxCollectionRepository {
    async fn collect(&self, user_id: i64, news_id: i64) -> Result<()> {
        let now = Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(
                    "INSERT OR IGNORE INTO user_collections (user_id, news_id, created_at) VALUES (?, ?, ?)",
                )
                .bind(user_id)
                .bind(news_id)
                .bind(now)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to collect news")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(
                    "INSERT IGNORE INTO user_collections (user_id, news_id, created_at) VALUES (?, ?, ?)",
                )
                .bind(user_id)
                .bind(news_id)
                .bind(now)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to collect news")?;
            }
        }
        Ok(())
    }

    async fn count_collected(&self, user_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) as count FROM user_collections WHERE user_id = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(user_id)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to count collections")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(user_id)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to count collections")?
                .get("count"),
        };
        Ok(count)
    }

    async fn list_collected(&self, user_id: i64, params: &ListParams) -> Result<Vec<News>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM news n
            INNER JOIN user_collections c ON c.news_id = n.id
            WHERE c.user_id = ?
            ORDER BY c.created_at DESC, n.id DESC
            LIMIT ? OFFSET ?
            "#,
            NEWS_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(user_id)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(self.pool.sqlite()?)
                .await
                .context("Failed to list collected news")?
                .iter()
                .map(row_to_news_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(user_id)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(self.pool.mysql()?)
                .await
                .context("Failed to list collected news")?
                .iter()
                .map(row_to_news_mysql)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{NewsRepository, SqlxNewsRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreateNewsInput, User};

    async fn setup(news_count: usize) -> (SqlxCollectionRepository, i64, Vec<i64>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new("13800000001".into(), "reader".into(), "hash".into()))
            .await
            .expect("Failed to create test user");

        let news_repo = SqlxNewsRepository::new(pool.clone());
        let mut news_ids = Vec::new();
        for i in 0..news_count {
            let input = CreateNewsInput {
                title: format!("news {}", i),
                digest: "digest".into(),
                content: "content".into(),
                category_id: 2,
            };
            let news = news_repo
                .create(&News::submission(user.id, input, "/uploads/k".into()))
                .await
                .expect("Failed to create news");
            news_ids.push(news.id);
        }

        (SqlxCollectionRepository::new(pool), user.id, news_ids)
    }

    #[tokio::test]
    async fn test_collect_and_count() {
        let (repo, user_id, news) = setup(2).await;

        repo.collect(user_id, news[0]).await.unwrap();
        repo.collect(user_id, news[0]).await.unwrap();
        repo.collect(user_id, news[1]).await.unwrap();
        assert_eq!(repo.count_collected(user_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_collected_paginates() {
        let (repo, user_id, news) = setup(12).await;
        for id in &news {
            repo.collect(user_id, *id).await.unwrap();
        }

        let first = repo.list_collected(user_id, &ListParams::new(1, 10)).await.unwrap();
        let second = repo.list_collected(user_id, &ListParams::new(2, 10)).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 2);
        assert!(first.iter().all(|n| n.title.starts_with("news ")));
    }

    #[tokio::test]
    async fn test_list_collected_empty() {
        let (repo, user_id, _) = setup(1).await;
        assert!(repo.list_collected(user_id, &ListParams::new(1, 10)).await.unwrap().is_empty());
    }
}
