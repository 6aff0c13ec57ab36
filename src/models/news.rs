//! News model
//!
//! News items, their moderation status, and the two listing shapes
//! (summary for collections, review for the author's own submissions).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source label attached to reader-submitted news
pub const PERSONAL_SOURCE: &str = "个人发布";

/// Timestamp format used in listings
const CREATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A news item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct News {
    /// Unique identifier
    pub id: i64,
    pub title: String,
    pub source: String,
    pub digest: String,
    pub content: String,
    pub clicks: i64,
    /// Full public URL of the index image
    pub index_image_url: Option<String>,
    pub category_id: i64,
    /// Author, when submitted by a reader
    pub user_id: Option<i64>,
    pub status: NewsStatus,
    /// Why moderation rejected the item
    pub reason: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl News {
    /// A reader submission awaiting review
    pub fn submission(author_id: i64, input: CreateNewsInput, index_image_url: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title: input.title,
            source: PERSONAL_SOURCE.to_string(),
            digest: input.digest,
            content: input.content,
            clicks: 0,
            index_image_url: Some(index_image_url),
            category_id: input.category_id,
            user_id: Some(author_id),
            status: NewsStatus::Pending,
            reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn create_time(&self) -> String {
        self.created_at.format(CREATE_TIME_FORMAT).to_string()
    }

    pub fn to_summary(&self) -> NewsSummary {
        NewsSummary {
            id: self.id,
            title: self.title.clone(),
            source: self.source.clone(),
            digest: self.digest.clone(),
            create_time: self.create_time(),
            index_image_url: self.index_image_url.clone().unwrap_or_default(),
            clicks: self.clicks,
        }
    }

    pub fn to_review(&self) -> NewsReview {
        NewsReview {
            id: self.id,
            title: self.title.clone(),
            create_time: self.create_time(),
            status: self.status.as_i32(),
            reason: self.reason.clone().unwrap_or_default(),
        }
    }
}

/// Moderation status, stored as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsStatus {
    Approved,
    #[default]
    Pending,
    Rejected,
}

impl NewsStatus {
    pub fn as_i32(self) -> i32 {
        match self {
            NewsStatus::Approved => 0,
            NewsStatus::Pending => 1,
            NewsStatus::Rejected => -1,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(NewsStatus::Approved),
            1 => Some(NewsStatus::Pending),
            -1 => Some(NewsStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for NewsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewsStatus::Approved => write!(f, "approved"),
            NewsStatus::Pending => write!(f, "pending"),
            NewsStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// News as shown in the collection listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSummary {
    pub id: i64,
    pub title: String,
    pub source: String,
    pub digest: String,
    pub create_time: String,
    pub index_image_url: String,
    pub clicks: i64,
}

/// News as shown in the author's own listing, with moderation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsReview {
    pub id: i64,
    pub title: String,
    pub create_time: String,
    pub status: i32,
    pub reason: String,
}

/// Validated fields of a news submission
#[derive(Debug, Clone)]
pub struct CreateNewsInput {
    pub title: String,
    pub digest: String,
    pub content: String,
    pub category_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn input() -> CreateNewsInput {
        CreateNewsInput {
            title: "Rates hold".to_string(),
            digest: "Central bank pauses".to_string(),
            content: "<p>Full text</p>".to_string(),
            category_id: 3,
        }
    }

    #[test]
    fn test_submission_is_pending_personal() {
        let news = News::submission(42, input(), "/uploads/key".to_string());

        assert_eq!(news.status, NewsStatus::Pending);
        assert_eq!(news.source, PERSONAL_SOURCE);
        assert_eq!(news.user_id, Some(42));
        assert_eq!(news.index_image_url.as_deref(), Some("/uploads/key"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(NewsStatus::Approved.as_i32(), 0);
        assert_eq!(NewsStatus::Pending.as_i32(), 1);
        assert_eq!(NewsStatus::Rejected.as_i32(), -1);
        assert_eq!(NewsStatus::from_i32(-1), Some(NewsStatus::Rejected));
        assert_eq!(NewsStatus::from_i32(7), None);
        assert_eq!(NewsStatus::default(), NewsStatus::Pending);
    }

    #[test]
    fn test_review_and_summary_shapes() {
        let mut news = News::submission(1, input(), "/uploads/key".to_string());
        news.id = 9;
        news.created_at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 5, 0).unwrap();
        news.status = NewsStatus::Rejected;
        news.reason = Some("duplicate".to_string());

        let review = news.to_review();
        assert_eq!(review.create_time, "2024-03-01 08:05:00");
        assert_eq!(review.status, -1);
        assert_eq!(review.reason, "duplicate");

        let summary = news.to_summary();
        assert_eq!(summary.id, 9);
        assert_eq!(summary.index_image_url, "/uploads/key");
        assert_eq!(summary.clicks, 0);
    }
}
