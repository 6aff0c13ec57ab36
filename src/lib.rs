//! Newsdesk - personal centre of a news portal
//!
//! Profile viewing and editing, avatar upload, password change, followed
//! users, collected news, and self-published news awaiting moderation.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod storage;
pub mod view;
