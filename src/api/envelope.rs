//! JSON result envelope
//!
//! Every JSON endpoint answers HTTP 200 with
//! `{"errno": "<code>", "errmsg": "<message>", "data": {...}?}`; the outcome
//! lives in `errno`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::services::{ProfileError, UserServiceError};

/// Result codes understood by the portal front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RetCode {
    #[serde(rename = "0")]
    Ok,
    #[serde(rename = "4001")]
    DbErr,
    #[serde(rename = "4101")]
    SessionErr,
    #[serde(rename = "4102")]
    LoginErr,
    #[serde(rename = "4103")]
    ParamErr,
    #[serde(rename = "4106")]
    PwdErr,
    #[serde(rename = "4301")]
    ThirdErr,
    #[serde(rename = "4500")]
    ServerErr,
}

impl RetCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetCode::Ok => "0",
            RetCode::DbErr => "4001",
            RetCode::SessionErr => "4101",
            RetCode::LoginErr => "4102",
            RetCode::ParamErr => "4103",
            RetCode::PwdErr => "4106",
            RetCode::ThirdErr => "4301",
            RetCode::ServerErr => "4500",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Envelope {
    pub errno: RetCode,
    pub errmsg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Envelope {
    pub fn new(errno: RetCode, errmsg: impl Into<String>) -> Self {
        Self {
            errno,
            errmsg: errmsg.into(),
            data: None,
        }
    }

    pub fn ok(errmsg: impl Into<String>) -> Self {
        Self::new(RetCode::Ok, errmsg)
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn param(errmsg: impl Into<String>) -> Self {
        Self::new(RetCode::ParamErr, errmsg)
    }

    pub fn no_session() -> Self {
        Self::new(RetCode::SessionErr, "用户未登录")
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

impl From<ProfileError> for Envelope {
    fn from(e: ProfileError) -> Self {
        let code = match &e {
            ProfileError::Param(_) => RetCode::ParamErr,
            ProfileError::Database { .. } => RetCode::DbErr,
            ProfileError::ThirdParty(_) => RetCode::ThirdErr,
            ProfileError::Password => RetCode::PwdErr,
            ProfileError::Internal(source) => {
                tracing::error!("Profile operation failed: {:#}", source);
                RetCode::ServerErr
            }
        };
        Self::new(code, e.to_string())
    }
}

impl From<UserServiceError> for Envelope {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::InvalidCredentials => Self::new(RetCode::LoginErr, e.to_string()),
            UserServiceError::ValidationError(msg) => Self::param(msg),
            UserServiceError::UserExists(msg) => Self::new(RetCode::ParamErr, msg),
            UserServiceError::InternalError(source) => {
                tracing::error!("Account operation failed: {:#}", source);
                Self::new(RetCode::DbErr, "数据库查询错误")
            }
        }
    }
}
