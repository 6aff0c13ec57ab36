//! Configuration management
//!
//! This module handles loading and parsing configuration for Newsdesk.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cache configuration (backs the session store)
    #[serde(default)]
    pub cache: CacheConfig,
    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// Object storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Upload limits
    #[serde(default)]
    pub upload: UploadConfig,
    /// Page sizes for the profile listings
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Template configuration
    #[serde(default)]
    pub view: ViewConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/newsdesk.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache driver (memory or redis)
    #[serde(default)]
    pub driver: CacheDriver,
    /// Redis connection URL (optional)
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Most sessions the memory driver keeps before evicting
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    /// Namespace prepended to every Redis key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            driver: CacheDriver::default(),
            redis_url: None,
            max_entries: default_max_entries(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_max_entries() -> u64 {
    crate::cache::memory::DEFAULT_MAX_ENTRIES
}

fn default_key_prefix() -> String {
    "newsdesk:".to_string()
}

/// Cache driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheDriver {
    /// In-memory cache (default)
    #[default]
    Memory,
    /// Redis cache
    Redis,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Days until a login session expires
    #[serde(default = "default_session_days")]
    pub expiration_days: i64,
    /// Name of the session cookie
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiration_days: default_session_days(),
            cookie_name: default_cookie_name(),
        }
    }
}

fn default_session_days() -> i64 {
    7
}

fn default_cookie_name() -> String {
    "session".to_string()
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage driver (local or remote)
    #[serde(default)]
    pub driver: StorageDriver,
    /// Public URL prefix prepended to stored keys
    #[serde(default = "default_domain_prefix")]
    pub domain_prefix: String,
    /// Directory used by the local driver
    #[serde(default = "default_local_path")]
    pub local_path: PathBuf,
    /// Upload endpoint of the remote object store
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Bucket name on the remote object store
    #[serde(default)]
    pub bucket: Option<String>,
    /// Bearer token for the remote object store
    #[serde(default)]
    pub access_token: Option<String>,
    /// Request timeout for remote uploads
    #[serde(default = "default_storage_timeout")]
    pub timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            driver: StorageDriver::default(),
            domain_prefix: default_domain_prefix(),
            local_path: default_local_path(),
            endpoint: None,
            bucket: None,
            access_token: None,
            timeout_seconds: default_storage_timeout(),
        }
    }
}

fn default_domain_prefix() -> String {
    "/uploads/".to_string()
}

fn default_local_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_storage_timeout() -> u64 {
    30
}

/// Storage driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageDriver {
    /// Files written under `local_path` and served by the app (default)
    #[default]
    Local,
    /// Remote HTTP object store
    Remote,
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum file size in bytes (default: 5MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed image MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_max_file_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }
}

/// Page sizes used by the profile listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Followed users per page
    #[serde(default = "default_followed_per_page")]
    pub followed_per_page: u32,
    /// Collected / authored news per page
    #[serde(default = "default_collection_per_page")]
    pub collection_per_page: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            followed_per_page: default_followed_per_page(),
            collection_per_page: default_collection_per_page(),
        }
    }
}

fn default_followed_per_page() -> u32 {
    4
}

fn default_collection_per_page() -> u32 {
    10
}

/// Template configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Directory whose templates override the embedded ones
    #[serde(default)]
    pub templates_path: Option<PathBuf>,
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist or is empty, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - NEWSDESK_SERVER_HOST
    /// - NEWSDESK_SERVER_PORT
    /// - NEWSDESK_DATABASE_DRIVER
    /// - NEWSDESK_DATABASE_URL
    /// - NEWSDESK_CACHE_DRIVER
    /// - NEWSDESK_CACHE_REDIS_URL
    /// - NEWSDESK_STORAGE_DRIVER
    /// - NEWSDESK_STORAGE_DOMAIN_PREFIX
    /// - NEWSDESK_STORAGE_ENDPOINT
    /// - NEWSDESK_STORAGE_ACCESS_TOKEN
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values the handlers cannot work with
    fn validate(&self) -> Result<(), ConfigError> {
        if self.pagination.followed_per_page == 0 || self.pagination.collection_per_page == 0 {
            return Err(ConfigError::ValidationError(
                "page sizes must be greater than zero".to_string(),
            ));
        }
        if self.storage.driver == StorageDriver::Remote && self.storage.endpoint.is_none() {
            return Err(ConfigError::ValidationError(
                "storage.endpoint is required for the remote storage driver".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("NEWSDESK_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("NEWSDESK_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(driver) = std::env::var("NEWSDESK_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("NEWSDESK_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(driver) = std::env::var("NEWSDESK_CACHE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "memory" => self.cache.driver = CacheDriver::Memory,
                "redis" => self.cache.driver = CacheDriver::Redis,
                _ => {}
            }
        }
        if let Ok(redis_url) = std::env::var("NEWSDESK_CACHE_REDIS_URL") {
            self.cache.redis_url = Some(redis_url);
        }

        if let Ok(driver) = std::env::var("NEWSDESK_STORAGE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "local" => self.storage.driver = StorageDriver::Local,
                "remote" => self.storage.driver = StorageDriver::Remote,
                _ => {}
            }
        }
        if let Ok(prefix) = std::env::var("NEWSDESK_STORAGE_DOMAIN_PREFIX") {
            self.storage.domain_prefix = prefix;
        }
        if let Ok(endpoint) = std::env::var("NEWSDESK_STORAGE_ENDPOINT") {
            self.storage.endpoint = Some(endpoint);
        }
        if let Ok(token) = std::env::var("NEWSDESK_STORAGE_ACCESS_TOKEN") {
            self.storage.access_token = Some(token);
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
