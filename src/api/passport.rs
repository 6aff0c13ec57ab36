//! Registration, login and logout
//!
//! - POST /passport/register - JSON `{mobile, nick_name, password}`
//! - POST /passport/login - JSON `{mobile, password}`, sets the session cookie
//! - POST /passport/logout - drops the session and clears the cookie

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::envelope::Envelope;
use crate::api::middleware::{extract_session_token, AppState};
use crate::models::CreateUserInput;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub mobile: Option<String>,
    pub nick_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub mobile: Option<String>,
    pub password: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// POST /passport/register
///
/// Creates the account only; the client logs in afterwards.
async fn register(State(state): State<AppState>, body: Result<Json<RegisterRequest>, JsonRejection>) -> Response {
    let input = match body {
        Ok(Json(RegisterRequest {
            mobile: Some(mobile),
            nick_name: Some(nick_name),
            password: Some(password),
        })) => CreateUserInput {
            mobile: mobile.trim().to_string(),
            nick_name: nick_name.trim().to_string(),
            password,
        },
        _ => return Envelope::param("参数错误").into_response(),
    };

    match state.user_service.register(input).await {
        Ok(user) => Envelope::ok("注册成功")
            .with_data(json!({ "user_id": user.id }))
            .into_response(),
        Err(e) => Envelope::from(e).into_response(),
    }
}

/// POST /passport/login
async fn login(State(state): State<AppState>, body: Result<Json<LoginRequest>, JsonRejection>) -> Response {
    let (mobile, password) = match body {
        Ok(Json(LoginRequest {
            mobile: Some(mobile),
            password: Some(password),
        })) if !mobile.trim().is_empty() && !password.is_empty() => (mobile, password),
        _ => return Envelope::param("参数错误").into_response(),
    };

    match state.user_service.login(mobile.trim(), &password).await {
        Ok((session, user)) => {
            tracing::info!("User {} logged in", user.id);
            let envelope = Envelope::ok("登录成功").with_data(json!({
                "user_id": user.id,
                "nick_name": user.nick_name,
            }));
            ([(header::SET_COOKIE, state.session_cookie(&session.id))], envelope).into_response()
        }
        Err(e) => Envelope::from(e).into_response(),
    }
}

/// POST /passport/logout
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = extract_session_token(&headers, &state.session.cookie_name) {
        if let Err(e) = state.user_service.logout(&token).await {
            return Envelope::from(e).into_response();
        }
    }

    (
        [(header::SET_COOKIE, state.expired_session_cookie())],
        Envelope::ok("OK"),
    )
        .into_response()
}
