//! HTTP request handlers.

mod auth;
mod file;
mod share;

pub use auth::{login, register};
pub use file::{delete_file, list_files, search_files, share_file, upload_file};
pub use share::resolve_share;

use std::sync::Arc;

use jsonwebtoken::{encode, EncodingKey, Header};

use crate::db::Database;
use crate::service::FileService;
use crate::web::error::ApiError;
use crate::web::middleware::JwtClaims;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database handle, used directly for account operations.
    pub db: Arc<Database>,
    /// File operations service.
    pub service: FileService,
    /// JWT encoding key.
    pub encoding_key: EncodingKey,
    /// Access token expiry in seconds.
    pub access_token_expiry: u64,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        db: Arc<Database>,
        service: FileService,
        jwt_secret: &str,
        access_token_expiry: u64,
    ) -> Self {
        Self {
            db,
            service,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            access_token_expiry,
        }
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(&self, user_id: i64, username: &str) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user_id,
            username: username.to_string(),
            iat: now,
            exp: now + self.access_token_expiry,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            ApiError::internal("Failed to generate token")
        })
    }
}
