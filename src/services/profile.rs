//! Profile service
//!
//! Everything a logged-in reader does from their personal centre: the
//! followed-users, collection and own-news listings, profile edits, avatar
//! upload, password change, and news submission.
//!
//! Listings never fail. A query error is logged and the caller gets an
//! empty page 1 of 1. Writes go through the repositories' transactions and
//! surface as `ProfileError`.

use crate::config::Config;
use crate::db::repositories::{
    CategoryRepository, CollectionRepository, FollowRepository, NewsRepository,
    SqlxCategoryRepository, SqlxCollectionRepository, SqlxFollowRepository, SqlxNewsRepository,
    SqlxUserRepository, UserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{
    Category, ChangePasswordInput, CreateNewsInput, Gender, ListParams, News, NewsReview,
    NewsSummary, PagedResult, UpdateBaseInfoInput, User, UserProfile,
};
use crate::services::password::{hash_password, verify_password};
use crate::services::session_store::SessionStore;
use crate::storage::{ObjectStorage, StorageError};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Failures of the profile write operations.
///
/// The display text is the user-facing message.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Missing or malformed input
    #[error("{0}")]
    Param(&'static str),

    /// A write failed and was rolled back
    #[error("{message}")]
    Database {
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// The object store refused the upload
    #[error("上传图片错误")]
    ThirdParty(#[source] StorageError),

    /// The old password did not match
    #[error("原密码错误")]
    Password,

    #[error("内部错误")]
    Internal(#[source] anyhow::Error),
}

/// An uploaded file as received from a multipart form
#[derive(Debug, Clone, Default)]
pub struct ImageUpload {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

/// Raw news submission form; every field is checked by `publish_news`
#[derive(Debug, Clone, Default)]
pub struct NewsSubmission {
    pub title: Option<String>,
    pub digest: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<String>,
    pub index_image: Option<ImageUpload>,
}

/// Tunables taken from configuration
#[derive(Debug, Clone)]
pub struct ProfileSettings {
    /// Prefix turning a storage key into a public URL
    pub domain_prefix: String,
    pub followed_per_page: u32,
    pub collection_per_page: u32,
    pub max_upload_size: u64,
    pub allowed_types: Vec<String>,
}

impl ProfileSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            domain_prefix: config.storage.domain_prefix.clone(),
            followed_per_page: config.pagination.followed_per_page,
            collection_per_page: config.pagination.collection_per_page,
            max_upload_size: config.upload.max_file_size,
            allowed_types: config.upload.allowed_types.clone(),
        }
    }
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Repositories the profile service reads and writes
#[derive(Clone)]
pub struct ProfileRepositories {
    pub users: Arc<dyn UserRepository>,
    pub follows: Arc<dyn FollowRepository>,
    pub collections: Arc<dyn CollectionRepository>,
    pub news: Arc<dyn NewsRepository>,
    pub categories: Arc<dyn CategoryRepository>,
}

impl ProfileRepositories {
    /// SQLx-backed repositories sharing one pool
    pub fn sqlx(pool: DynDatabasePool) -> Self {
        Self {
            users: SqlxUserRepository::boxed(pool.clone()),
            follows: SqlxFollowRepository::boxed(pool.clone()),
            collections: SqlxCollectionRepository::boxed(pool.clone()),
            news: SqlxNewsRepository::boxed(pool.clone()),
            categories: SqlxCategoryRepository::boxed(pool),
        }
    }
}

pub struct ProfileService {
    repos: ProfileRepositories,
    storage: Arc<dyn ObjectStorage>,
    sessions: Arc<SessionStore>,
    settings: ProfileSettings,
}

impl ProfileService {
    pub fn new(
        repos: ProfileRepositories,
        storage: Arc<dyn ObjectStorage>,
        sessions: Arc<SessionStore>,
        settings: ProfileSettings,
    ) -> Self {
        Self {
            repos,
            storage,
            sessions,
            settings,
        }
    }

    pub fn settings(&self) -> &ProfileSettings {
        &self.settings
    }

    // ========================================================================
    // Read side
    // ========================================================================

    /// Public profile of `user`. Counts fall back to 0 when unavailable.
    pub async fn profile_of(&self, user: &User) -> UserProfile {
        let followers = self.repos.follows.count_followers(user.id).await.unwrap_or_else(|e| {
            tracing::error!("Failed to count followers of user {}: {:#}", user.id, e);
            0
        });
        let news = self.repos.news.count_by_author(user.id).await.unwrap_or_else(|e| {
            tracing::error!("Failed to count news of user {}: {:#}", user.id, e);
            0
        });
        user.to_profile(&self.settings.domain_prefix, followers, news)
    }

    /// Users `user` follows, `followed_per_page` per page
    pub async fn followed_users(&self, user: &User, page: u32) -> PagedResult<UserProfile> {
        let listing = async {
            let total = self.repos.follows.count_followed(user.id).await?;
            let params = ListParams::new(page, self.settings.followed_per_page).clamp_to(total);
            let users = self.repos.follows.list_followed(user.id, &params).await?;
            anyhow::Ok(PagedResult::new(users, total, &params))
        };

        match listing.await {
            Ok(result) => {
                let mut profiles = Vec::with_capacity(result.items.len());
                for followed in &result.items {
                    profiles.push(self.profile_of(followed).await);
                }
                PagedResult {
                    items: profiles,
                    total: result.total,
                    current_page: result.current_page,
                    total_page: result.total_page,
                }
            }
            Err(e) => {
                tracing::error!("Failed to list followed users of user {}: {:#}", user.id, e);
                PagedResult::empty()
            }
        }
    }

    /// News `user` has collected, `collection_per_page` per page
    pub async fn collections(&self, user: &User, page: u32) -> PagedResult<NewsSummary> {
        let listing = async {
            let total = self.repos.collections.count_collected(user.id).await?;
            let params = ListParams::new(page, self.settings.collection_per_page).clamp_to(total);
            let news = self.repos.collections.list_collected(user.id, &params).await?;
            anyhow::Ok(PagedResult::new(news, total, &params))
        };

        match listing.await {
            Ok(result) => result.map(|news| news.to_summary()),
            Err(e) => {
                tracing::error!("Failed to list collections of user {}: {:#}", user.id, e);
                PagedResult::empty()
            }
        }
    }

    /// News `user` has submitted, newest first, with moderation status
    pub async fn authored_news(&self, user: &User, page: u32) -> PagedResult<NewsReview> {
        let listing = async {
            let total = self.repos.news.count_by_author(user.id).await?;
            let params = ListParams::new(page, self.settings.collection_per_page).clamp_to(total);
            let news = self.repos.news.list_by_author(user.id, &params).await?;
            anyhow::Ok(PagedResult::new(news, total, &params))
        };

        match listing.await {
            Ok(result) => result.map(|news| news.to_review()),
            Err(e) => {
                tracing::error!("Failed to list news of user {}: {:#}", user.id, e);
                PagedResult::empty()
            }
        }
    }

    /// Categories offered on the submission form, without the "latest" entry
    pub async fn release_categories(&self) -> Vec<Category> {
        match self.repos.categories.list_all().await {
            Ok(categories) => categories.into_iter().skip(1).collect(),
            Err(e) => {
                tracing::error!("Failed to list categories: {:#}", e);
                Vec::new()
            }
        }
    }

    // ========================================================================
    // Write side
    // ========================================================================

    /// Change nickname, gender and signature, then mirror the nickname into
    /// the session store of `session_token`.
    pub async fn update_base_info(
        &self,
        user: &User,
        session_token: &str,
        input: UpdateBaseInfoInput,
    ) -> Result<User, ProfileError> {
        let (nick_name, gender, signature) = match (
            non_empty(input.nick_name),
            non_empty(input.gender),
            non_empty(input.signature),
        ) {
            (Some(nick_name), Some(gender), Some(signature)) => (nick_name, gender, signature),
            _ => return Err(ProfileError::Param("参数有误")),
        };
        let gender = Gender::from_str(&gender).map_err(|_| ProfileError::Param("参数错误"))?;

        let updated = self
            .repos
            .users
            .update_base_info(user.id, &nick_name, gender, &signature)
            .await
            .map_err(|e| database_error("保存数据失败", e))?;

        if let Err(e) = self.sessions.set_nick_name(session_token, &updated).await {
            tracing::warn!("Failed to mirror nickname into session: {:#}", e);
        }

        Ok(updated)
    }

    /// Store a new avatar and return its public URL
    pub async fn update_avatar(&self, user: &User, upload: Option<ImageUpload>) -> Result<String, ProfileError> {
        let upload = self.check_image(upload, "读取文件错误")?;
        let key = self.store_image(upload).await?;

        let updated = self
            .repos
            .users
            .update_avatar(user.id, &key)
            .await
            .map_err(|e| database_error("保存数据失败", e))?;

        Ok(updated.avatar_url_with(&self.settings.domain_prefix))
    }

    /// Replace the password after checking the old one
    pub async fn change_password(&self, user: &User, input: ChangePasswordInput) -> Result<(), ProfileError> {
        let (old_password, new_password) = match (non_empty(input.old_password), non_empty(input.new_password)) {
            (Some(old), Some(new)) => (old, new),
            _ => return Err(ProfileError::Param("参数错误")),
        };

        let matches = verify_password(&old_password, &user.password_hash).map_err(ProfileError::Internal)?;
        if !matches {
            return Err(ProfileError::Password);
        }

        let password_hash = hash_password(&new_password).map_err(ProfileError::Internal)?;

        self.repos
            .users
            .update_password(user.id, &password_hash)
            .await
            .map_err(|e| database_error("保存失败", e))?;

        Ok(())
    }

    /// Submit a news item for moderation
    pub async fn publish_news(&self, user: &User, submission: NewsSubmission) -> Result<News, ProfileError> {
        let (title, digest, content, category_id, index_image) = match (
            non_empty(submission.title),
            non_empty(submission.digest),
            non_empty(submission.content),
            non_empty(submission.category_id),
            submission.index_image,
        ) {
            (Some(title), Some(digest), Some(content), Some(category_id), Some(index_image)) => {
                (title, digest, content, category_id, index_image)
            }
            _ => return Err(ProfileError::Param("参数有误")),
        };
        let category_id: i64 = category_id.trim().parse().map_err(|_| ProfileError::Param("参数有误"))?;

        let upload = self.check_image(Some(index_image), "图片错误")?;
        let key = self.store_image(upload).await?;

        let input = CreateNewsInput {
            title,
            digest,
            content,
            category_id,
        };
        let index_image_url = format!("{}{}", self.settings.domain_prefix, key);
        let news = News::submission(user.id, input, index_image_url);

        let created = self
            .repos
            .news
            .create(&news)
            .await
            .map_err(|e| database_error("保存数据失败", e))?;

        tracing::info!("User {} submitted news {} for review", user.id, created.id);
        Ok(created)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn check_image(&self, upload: Option<ImageUpload>, message: &'static str) -> Result<ImageUpload, ProfileError> {
        let upload = match upload {
            Some(upload) if !upload.data.is_empty() => upload,
            _ => return Err(ProfileError::Param(message)),
        };

        if upload.data.len() as u64 > self.settings.max_upload_size {
            return Err(ProfileError::Param("图片过大"));
        }

        if let Some(content_type) = upload.content_type.as_deref() {
            if !self.settings.allowed_types.iter().any(|t| t == content_type) {
                return Err(ProfileError::Param("图片格式错误"));
            }
        }

        Ok(upload)
    }

    async fn store_image(&self, upload: ImageUpload) -> Result<String, ProfileError> {
        let content_type = upload
            .content_type
            .unwrap_or_else(|| "application/octet-stream".to_string());

        self.storage.upload(upload.data, &content_type).await.map_err(|e| {
            tracing::error!("Image upload failed: {}", e);
            ProfileError::ThirdParty(e)
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn database_error(message: &'static str, source: anyhow::Error) -> ProfileError {
    tracing::error!("{}: {:#}", message, source);
    ProfileError::Database { message, source }
}
