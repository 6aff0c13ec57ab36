//! Database layer
//!
//! Relational storage for users, news, categories, sessions and the
//! follow/collection join tables. Supports:
//! - SQLite (default, single-binary deployment)
//! - MySQL (the portal's production store)
//!
//! The driver is selected from configuration. Repositories hold a
//! `DynDatabasePool` and dispatch on `driver()`; every write they perform runs
//! inside a transaction that is committed as a whole or rolled back.
//!
//! # Usage
//!
//! ```ignore
//! use newsdesk::config::DatabaseConfig;
//! use newsdesk::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
