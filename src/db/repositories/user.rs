//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL
//!
//! Profile updates touch only the columns they own (base info, avatar or
//! password hash), each inside a transaction that is rolled back when the
//! statement fails.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Gender, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

pub(crate) const USER_COLUMNS: &str = "u.id, u.mobile, u.nick_name, u.password_hash, u.avatar_url, \
     u.signature, u.gender, u.is_admin, u.last_login, u.created_at, u.updated_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by mobile number
    async fn get_by_mobile(&self, mobile: &str) -> Result<Option<User>>;

    /// Set nickname, gender and signature
    async fn update_base_info(&self, id: i64, nick_name: &str, gender: Gender, signature: &str) -> Result<User>;

    /// Set the avatar storage key
    async fn update_avatar(&self, id: i64, avatar_url: &str) -> Result<User>;

    /// Replace the password hash
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()>;

    /// Stamp the last login time
    async fn update_last_login(&self, id: i64) -> Result<()>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }

    async fn apply(&self, id: i64, change: &ProfileChange<'_>) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_user_sqlite(self.pool.sqlite()?, id, change).await,
            DatabaseDriver::Mysql => update_user_mysql(self.pool.mysql()?, id, change).await,
        }
    }
}

/// One group of user columns written together
enum ProfileChange<'a> {
    BaseInfo {
        nick_name: &'a str,
        gender: Gender,
        signature: &'a str,
    },
    Avatar(&'a str),
    Password(&'a str),
}

impl ProfileChange<'_> {
    fn update_sql(&self) -> &'static str {
        match self {
            ProfileChange::BaseInfo { .. } => {
                "UPDATE users SET nick_name = ?, gender = ?, signature = ?, updated_at = ? WHERE id = ?"
            }
            ProfileChange::Avatar(_) => "UPDATE users SET avatar_url = ?, updated_at = ? WHERE id = ?",
            ProfileChange::Password(_) => "UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?",
        }
    }

    /// Values for the SET placeholders, in order
    fn values(&self) -> Vec<String> {
        match self {
            ProfileChange::BaseInfo {
                nick_name,
                gender,
                signature,
            } => vec![nick_name.to_string(), gender.to_string(), signature.to_string()],
            ProfileChange::Avatar(avatar_url) => vec![avatar_url.to_string()],
            ProfileChange::Password(password_hash) => vec![password_hash.to_string()],
        }
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.sqlite()?, user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.mysql()?, user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_user_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_user_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn get_by_mobile(&self, mobile: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_user_by_mobile_sqlite(self.pool.sqlite()?, mobile).await,
            DatabaseDriver::Mysql => get_user_by_mobile_mysql(self.pool.mysql()?, mobile).await,
        }
    }

    async fn update_base_info(&self, id: i64, nick_name: &str, gender: Gender, signature: &str) -> Result<User> {
        let change = ProfileChange::BaseInfo {
            nick_name,
            gender,
            signature,
        };
        self.apply(id, &change).await
    }

    async fn update_avatar(&self, id: i64, avatar_url: &str) -> Result<User> {
        self.apply(id, &ProfileChange::Avatar(avatar_url)).await
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        self.apply(id, &ProfileChange::Password(password_hash)).await?;
        Ok(())
    }

    async fn update_last_login(&self, id: i64) -> Result<()> {
        let sql = "UPDATE users SET last_login = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(Utc::now())
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to update last login")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(Utc::now())
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to update last login")?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (mobile, nick_name, password_hash, avatar_url, signature, gender, is_admin, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.mobile)
    .bind(&user.nick_name)
    .bind(&user.password_hash)
    .bind(&user.avatar_url)
    .bind(&user.signature)
    .bind(user.gender.to_string())
    .bind(user.is_admin)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users u WHERE u.id = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn get_user_by_mobile_sqlite(pool: &SqlitePool, mobile: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users u WHERE u.mobile = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(mobile)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by mobile")?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn update_user_sqlite(pool: &SqlitePool, id: i64, change: &ProfileChange<'_>) -> Result<User> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let mut query = sqlx::query(change.update_sql());
    for value in change.values() {
        query = query.bind(value);
    }
    let result = query.bind(Utc::now()).bind(id).execute(&mut *tx).await;

    if let Err(e) = result {
        tx.rollback().await.context("Failed to roll back user update")?;
        return Err(e).context("Failed to update user");
    }
    tx.commit().await.context("Failed to commit user update")?;

    get_user_by_id_sqlite(pool, id)
        .await?
        .context("User not found after update")
}

pub(crate) fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let gender_str: String = row.get("gender");
    let gender = Gender::from_str(&gender_str)
        .with_context(|| format!("Invalid gender in database: {}", gender_str))?;

    Ok(User {
        id: row.get("id"),
        mobile: row.get("mobile"),
        nick_name: row.get("nick_name"),
        password_hash: row.get("password_hash"),
        avatar_url: row.get("avatar_url"),
        signature: row.get("signature"),
        gender,
        is_admin: row.get("is_admin"),
        last_login: row.get("last_login"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (mobile, nick_name, password_hash, avatar_url, signature, gender, is_admin, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.mobile)
    .bind(&user.nick_name)
    .bind(&user.password_hash)
    .bind(&user.avatar_url)
    .bind(&user.signature)
    .bind(user.gender.to_string())
    .bind(user.is_admin)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users u WHERE u.id = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn get_user_by_mobile_mysql(pool: &MySqlPool, mobile: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users u WHERE u.mobile = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(mobile)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by mobile")?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn update_user_mysql(pool: &MySqlPool, id: i64, change: &ProfileChange<'_>) -> Result<User> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let mut query = sqlx::query(change.update_sql());
    for value in change.values() {
        query = query.bind(value);
    }
    let result = query.bind(Utc::now()).bind(id).execute(&mut *tx).await;

    if let Err(e) = result {
        tx.rollback().await.context("Failed to roll back user update")?;
        return Err(e).context("Failed to update user");
    }
    tx.commit().await.context("Failed to commit user update")?;

    get_user_by_id_mysql(pool, id)
        .await?
        .context("User not found after update")
}

pub(crate) fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let gender_str: String = row.get("gender");
    let gender = Gender::from_str(&gender_str)
        .with_context(|| format!("Invalid gender in database: {}", gender_str))?;

    Ok(User {
        id: row.get("id"),
        mobile: row.get("mobile"),
        nick_name: row.get("nick_name"),
        password_hash: row.get("password_hash"),
        avatar_url: row.get("avatar_url"),
        signature: row.get("signature"),
        gender,
        is_admin: row.get("is_admin"),
        last_login: row.get("last_login"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
