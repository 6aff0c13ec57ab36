//! Data models
//!
//! Data structures used throughout Newsdesk:
//! - Database entities (User, News, Category, Session)
//! - Public representations handed to views and JSON responses
//! - Pagination parameters and results

mod category;
mod news;
mod pagination;
mod session;
mod user;

pub use category::Category;
pub use news::{CreateNewsInput, News, NewsReview, NewsStatus, NewsSummary, PERSONAL_SOURCE};
pub use pagination::{total_pages, ListParams, PagedResult};
pub use session::Session;
pub use user::{ChangePasswordInput, CreateUserInput, Gender, UpdateBaseInfoInput, User, UserProfile};
