//! filedrop - self-hostable file sharing service.
//!
//! Authenticated uploads land in a pluggable storage backend (local disk or
//! an S3-compatible object store), metadata lives in SQL, listings go
//! through a short-TTL cache, and files can be shared publicly via expiring
//! tokens that a background worker reclaims once they lapse.

pub mod auth;
pub mod cache;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod logging;
pub mod reclaim;
pub mod service;
pub mod share;
pub mod storage;
pub mod web;

pub use auth::{hash_password, validate_password, verify_password, PasswordError};
pub use cache::CacheLayer;
pub use config::{Config, StorageConfig};
pub use db::{Database, FileRecord, FileRepository, NewFileRecord, NewUser, User, UserRepository};
pub use error::{FiledropError, Result};
pub use reclaim::ReclamationWorker;
pub use service::{FileService, FileSummary, ShareGrant};
pub use storage::{LocalStorage, StorageBackend};
pub use web::WebServer;
