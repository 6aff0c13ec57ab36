//! API layer - HTTP handlers and routing
//!
//! - Personal centre pages and their JSON write endpoints
//! - Passport login/logout
//! - Static serving of locally stored uploads

pub mod common;
pub mod envelope;
pub mod middleware;
pub mod passport;
pub mod profile;

#[cfg(test)]
mod tests;

use axum::{extract::DefaultBodyLimit, middleware as axum_middleware, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::{Config, StorageDriver};

pub use envelope::{Envelope, RetCode};
pub use middleware::{AppState, CurrentUser, PageUser};

/// Multipart framing allowance on top of the largest accepted file
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the complete router with middleware
pub fn build_router(state: AppState, config: &Config) -> Router {
    let body_limit = usize::try_from(config.upload.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD_BYTES);

    let mut router = Router::new()
        .merge(profile::router())
        .nest("/passport", passport::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_user,
        ));

    if config.storage.driver == StorageDriver::Local {
        let prefix = config.storage.domain_prefix.trim_end_matches('/');
        if prefix.starts_with('/') && prefix.len() > 1 {
            tracing::info!("Serving uploads from {:?} at {}", config.storage.local_path, prefix);
            router = router.nest_service(prefix, ServeDir::new(&config.storage.local_path));
        }
    }

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
