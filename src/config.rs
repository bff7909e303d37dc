//! Configuration module for filedrop.

use serde::Deserialize;
use std::path::Path;

use crate::{FiledropError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL used when building share links.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: default_base_url(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file (connection URL under the
    /// `postgres` feature).
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/filedrop.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Storage backend configuration.
///
/// The backend kind is a tagged variant resolved once at startup into a
/// concrete backend; handlers never branch on it again.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage, served under `{base_url}/uploads`.
    Local {
        /// Root directory for stored files.
        #[serde(default = "default_storage_root")]
        root_dir: String,
    },
    /// S3-compatible object storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// AWS region.
        #[serde(default)]
        region: Option<String>,
        /// Custom endpoint for S3-compatible services (e.g. MinIO).
        #[serde(default)]
        endpoint_url: Option<String>,
        /// Optional prefix prepended to every object key.
        #[serde(default)]
        key_prefix: Option<String>,
    },
}

fn default_storage_root() -> String {
    "data/files".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Local {
            root_dir: default_storage_root(),
        }
    }
}

/// Listing cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Redis connection URL. When absent, only the in-process cache is used.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// TTL for cached per-owner listings, in seconds.
    #[serde(default = "default_listing_ttl")]
    pub listing_ttl_secs: u64,
}

fn default_listing_ttl() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            listing_ttl_secs: default_listing_ttl(),
        }
    }
}

/// Reclamation worker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReclaimConfig {
    /// Seconds between reclamation sweeps.
    #[serde(default = "default_reclaim_interval")]
    pub interval_secs: u64,
}

fn default_reclaim_interval() -> u64 {
    3600
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reclaim_interval(),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign access tokens.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_jwt_secret() -> String {
    "change-me".to_string()
}

fn default_token_expiry() -> u64 {
    86400
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            access_token_expiry_secs: default_token_expiry(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file path. Empty disables file logging.
    #[serde(default)]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: String::new(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub reclaim: ReclaimConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| FiledropError::Config(e.to_string()))
    }
}
