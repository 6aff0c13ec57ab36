//! Newsdesk - personal centre of the news portal

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsdesk::{
    api::{self, AppState},
    cache::create_cache,
    config::Config,
    db::{
        self,
        repositories::{SqlxSessionRepository, SqlxUserRepository},
    },
    services::{ProfileRepositories, ProfileService, ProfileSettings, SessionStore, UserService},
    storage::create_storage,
    view::ViewEngine,
};

/// How often expired login sessions are purged
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsdesk=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Newsdesk...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    // Session store on top of the cache
    let cache = create_cache(&config.cache).await?;
    let session_ttl = Duration::from_secs(config.session.expiration_days.max(1) as u64 * 24 * 60 * 60);
    let sessions = Arc::new(SessionStore::new(cache, session_ttl));
    tracing::info!("Session store initialized: {:?}", config.cache.driver);

    let storage = create_storage(&config.storage)?;
    tracing::info!("Object storage initialized: {:?}", config.storage.driver);

    // Initialize services
    let user_service = Arc::new(UserService::with_session_expiration(
        SqlxUserRepository::boxed(pool.clone()),
        SqlxSessionRepository::boxed(pool.clone()),
        sessions.clone(),
        config.session.expiration_days,
    ));
    let profile_service = Arc::new(ProfileService::new(
        ProfileRepositories::sqlx(pool.clone()),
        storage,
        sessions,
        ProfileSettings::from_config(&config),
    ));

    match user_service.cleanup_expired_sessions().await {
        Ok(count) if count > 0 => tracing::info!("Removed {} expired sessions", count),
        Ok(_) => {}
        Err(e) => tracing::warn!("Failed to clean up expired sessions: {}", e),
    }

    // Start session cleanup task
    {
        let user_service = user_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                if let Err(e) = user_service.cleanup_expired_sessions().await {
                    tracing::warn!("Failed to clean up expired sessions: {}", e);
                }
            }
        });
    }

    let views = ViewEngine::new(config.view.templates_path.as_deref())?;
    tracing::info!("Templates loaded");

    let state = AppState {
        user_service,
        profile_service,
        views: Arc::new(views),
        session: Arc::new(config.session.clone()),
    };

    // Build router
    let app = api::build_router(state, &config);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
