//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for one entity or join table.

pub mod category;
pub mod collection;
pub mod follow;
pub mod news;
pub mod session;
pub mod user;

pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use collection::{CollectionRepository, SqlxCollectionRepository};
pub use follow::{FollowRepository, SqlxFollowRepository};
pub use news::{NewsRepository, SqlxNewsRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
