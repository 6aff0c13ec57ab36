//! Common API utilities and shared types

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use tera::Context;

use crate::view::ViewEngine;

/// Page selector of the paginated listings (`?p=2`)
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub p: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> u32 {
        parse_page(self.p.as_deref())
    }
}

/// Parse a 1-based page number; anything unusable means page 1
pub fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

/// Render a page template, answering 500 when it fails
pub fn render_page(views: &ViewEngine, template: &str, context: &Context) -> Response {
    match views.render(template, context) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render {}: {}", template, e);
            (StatusCode::INTERNAL_SERVER_ERROR, Html(ViewEngine::error_page(template))).into_response()
        }
    }
}
