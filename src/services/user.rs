//! User service
//!
//! Account creation and the login session lifecycle:
//! - register: create an account with a hashed password
//! - login: verify credentials, open a session, seed the session store
//! - logout: drop the session row and its cached data
//! - validate_session: resolve a token to its user, discarding expired sessions

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{CreateUserInput, Session, User};
use crate::services::password::{hash_password, verify_password};
use crate::services::session_store::{SessionData, SessionStore};
use anyhow::Context;
use std::sync::Arc;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Unknown mobile or wrong password
    #[error("用户名或密码错误")]
    InvalidCredentials,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for accounts and login sessions
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    sessions: Arc<SessionStore>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self::with_session_expiration(user_repo, session_repo, sessions, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        sessions: Arc<SessionStore>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            sessions,
            session_expiration_days,
        }
    }

    /// Register a new account
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        if input.mobile.trim().is_empty() {
            return Err(UserServiceError::ValidationError("手机号不能为空".to_string()));
        }
        if input.nick_name.trim().is_empty() {
            return Err(UserServiceError::ValidationError("昵称不能为空".to_string()));
        }
        if input.password.is_empty() {
            return Err(UserServiceError::ValidationError("密码不能为空".to_string()));
        }

        if self
            .user_repo
            .get_by_mobile(&input.mobile)
            .await
            .context("Failed to check mobile")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!("手机号 {} 已注册", input.mobile)));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(input.mobile, input.nick_name, password_hash);

        let created = self.user_repo.create(&user).await.context("Failed to create user")?;
        tracing::info!("Registered user {} ({})", created.id, created.nick_name);

        Ok(created)
    }

    /// Verify credentials and open a session.
    ///
    /// Unknown mobiles and wrong passwords produce the same error.
    pub async fn login(&self, mobile: &str, password: &str) -> Result<(Session, User), UserServiceError> {
        let user = self
            .user_repo
            .get_by_mobile(mobile)
            .await
            .context("Failed to get user by mobile")?
            .ok_or(UserServiceError::InvalidCredentials)?;

        let password_valid =
            verify_password(password, &user.password_hash).context("Failed to verify password")?;
        if !password_valid {
            return Err(UserServiceError::InvalidCredentials);
        }

        let session = Session::start(user.id, self.session_expiration_days);
        self.session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        if let Err(e) = self.user_repo.update_last_login(user.id).await {
            tracing::warn!("Failed to record last login for user {}: {:#}", user.id, e);
        }

        self.sessions
            .put(&session.id, &SessionData::from(&user))
            .await
            .context("Failed to store session data")?;

        Ok((session, user))
    }

    /// Logout (invalidate session)
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;

        if let Err(e) = self.sessions.remove(session_id).await {
            tracing::warn!("Failed to drop cached session data: {:#}", e);
        }

        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Returns `None` for unknown or expired tokens; expired sessions are deleted.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {:#}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cache, MemoryCache};
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use std::time::Duration;

    async fn setup_test_service() -> (UserService, Arc<SessionStore>, Arc<dyn SessionRepository>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let sessions = Arc::new(SessionStore::new(
            Arc::new(Cache::Memory(MemoryCache::new())),
            Duration::from_secs(60),
        ));
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let service = UserService::new(SqlxUserRepository::boxed(pool), session_repo.clone(), sessions.clone());

        (service, sessions, session_repo)
    }

    fn register_input(mobile: &str, nick_name: &str, password: &str) -> CreateUserInput {
        CreateUserInput {
            mobile: mobile.to_string(),
            nick_name: nick_name.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_hashes_password() {
        let (service, _, _) = setup_test_service().await;

        let user = service
            .register(register_input("13800000001", "reader", "password123"))
            .await
            .expect("Failed to register");

        assert!(user.id > 0);
        assert_ne!(user.password_hash, "password123");
        assert!(verify_password("password123", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicate_mobile() {
        let (service, _, _) = setup_test_service().await;
        service.register(register_input("13800000001", "a", "pw")).await.unwrap();

        let result = service.register(register_input("13800000001", "b", "pw")).await;
        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_empty_fields() {
        let (service, _, _) = setup_test_service().await;

        for input in [
            register_input("", "a", "pw"),
            register_input("13800000001", " ", "pw"),
            register_input("13800000001", "a", ""),
        ] {
            assert!(matches!(
                service.register(input).await,
                Err(UserServiceError::ValidationError(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_login_seeds_session_store() {
        let (service, sessions, _) = setup_test_service().await;
        service.register(register_input("13800000001", "reader", "pw")).await.unwrap();

        let (session, user) = service.login("13800000001", "pw").await.expect("Failed to login");

        let data = sessions.get(&session.id).await.unwrap().expect("Session data missing");
        assert_eq!(data.user_id, user.id);
        assert_eq!(data.nick_name, "reader");

        let resolved = service.validate_session(&session.id).await.unwrap().expect("User not found");
        assert_eq!(resolved.id, user.id);
        assert!(resolved.last_login.is_some());
    }

    #[tokio::test]
    async fn test_login_invalid_credentials() {
        let (service, _, _) = setup_test_service().await;
        service.register(register_input("13800000001", "reader", "pw")).await.unwrap();

        assert!(matches!(
            service.login("13800000001", "wrong").await,
            Err(UserServiceError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login("19900000000", "pw").await,
            Err(UserServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let (service, sessions, _) = setup_test_service().await;
        service.register(register_input("13800000001", "reader", "pw")).await.unwrap();
        let (session, _) = service.login("13800000001", "pw").await.unwrap();

        service.logout(&session.id).await.expect("Failed to logout");

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert!(sessions.get(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_discarded() {
        let (service, _, session_repo) = setup_test_service().await;
        let user = service.register(register_input("13800000001", "reader", "pw")).await.unwrap();

        let stale = Session::start(user.id, -1);
        session_repo.create(&stale).await.unwrap();

        assert!(service.validate_session(&stale.id).await.unwrap().is_none());
        assert!(session_repo.get_by_id(&stale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let (service, _, _) = setup_test_service().await;
        assert!(service.validate_session("nope").await.unwrap().is_none());
    }
}
