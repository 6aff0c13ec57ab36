//! API middleware
//!
//! Session resolution and the extractors handlers use to get the reader:
//! - `resolve_user` looks up the session token and stores the reader in the
//!   request extensions
//! - `CurrentUser` hands the reader to JSON handlers (SESSIONERR when absent)
//! - `PageUser` hands the reader to page handlers (redirect to `/` when absent)

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{Redirect, Response},
};
use std::sync::Arc;

use crate::api::envelope::Envelope;
use crate::config::SessionConfig;
use crate::models::User;
use crate::services::{ProfileService, UserService};
use crate::view::ViewEngine;

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub profile_service: Arc<ProfileService>,
    pub views: Arc<ViewEngine>,
    pub session: Arc<SessionConfig>,
}

impl AppState {
    /// `Set-Cookie` value carrying a fresh session token
    pub fn session_cookie(&self, token: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.session.cookie_name,
            token,
            self.session.expiration_days * 24 * 60 * 60
        )
    }

    /// `Set-Cookie` value that removes the session cookie
    pub fn expired_session_cookie(&self) -> String {
        format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", self.session.cookie_name)
    }
}

/// The logged-in reader and the token that identified them
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

/// Same as `CurrentUser`, for handlers that render pages
#[derive(Debug, Clone)]
pub struct PageUser(pub CurrentUser);

/// Extract the session token from `Authorization: Bearer` or the session cookie
pub fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    for cookie_header in headers.get_all(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some((name, value)) = cookie.trim().split_once('=') {
                    if name == cookie_name && !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Resolve the session token, if any, to a `CurrentUser`.
///
/// Requests without a valid session pass through anonymously.
pub async fn resolve_user(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if let Some(token) = extract_session_token(request.headers(), &state.session.cookie_name) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(CurrentUser { user, token });
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Session lookup failed: {}", e),
        }
    }
    next.run(request).await
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Envelope;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(Envelope::no_session)
    }
}

impl<S> FromRequestParts<S> for PageUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .map(PageUser)
            .ok_or_else(|| Redirect::to("/"))
    }
}
