//! Storage backends for filedrop.
//!
//! A [`StorageBackend`] owns the physical bytes behind a file record. The
//! contract is deliberately narrow so that callers cannot depend on
//! backend-specific semantics: a locator is opaque, and a resolved URL may or
//! may not be time-limited (the local variant ignores the TTL; callers must
//! tolerate that asymmetry).

mod local;
#[cfg(feature = "s3")]
mod s3;

pub use local::LocalStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::StorageConfig;
use crate::Result;

/// Contract for storing uploaded bytes and producing retrieval URLs.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store an upload and return its locator.
    ///
    /// The destination name must be collision-resistant: two uploads with the
    /// same original filename by the same owner never overwrite each other.
    /// On any mid-write failure the destination is absent or unreferenced.
    async fn store(&self, data: &[u8], owner_id: i64, original_name: &str) -> Result<String>;

    /// Resolve a locator into a retrieval URL.
    ///
    /// The object-store variant returns a signed URL valid for exactly `ttl`;
    /// the local variant returns a stable unsigned path under the service's
    /// serving root and ignores `ttl`.
    async fn resolve_url(&self, locator: &str, ttl: Duration) -> Result<String>;

    /// Delete the stored object. Idempotent: deleting an absent object is Ok.
    async fn delete(&self, locator: &str) -> Result<()>;

    /// Backend kind, for logging ("local" or "s3").
    fn kind(&self) -> &'static str;
}

/// Build the configured backend once at startup.
///
/// The tagged config variant is resolved here into a concrete strategy
/// object; nothing downstream branches on the backend kind again.
pub async fn from_config(
    config: &StorageConfig,
    base_url: &str,
) -> Result<Arc<dyn StorageBackend>> {
    match config {
        StorageConfig::Local { root_dir } => {
            let storage = LocalStorage::new(root_dir, format!("{base_url}/uploads"))?;
            Ok(Arc::new(storage))
        }
        #[cfg(feature = "s3")]
        StorageConfig::S3 {
            bucket,
            region,
            endpoint_url,
            key_prefix,
        } => {
            let storage = S3Storage::new(
                bucket,
                region.as_deref(),
                endpoint_url.as_deref(),
                key_prefix.as_deref(),
            )
            .await?;
            Ok(Arc::new(storage))
        }
        #[cfg(not(feature = "s3"))]
        StorageConfig::S3 { .. } => Err(crate::FiledropError::Config(
            "s3 backend requested but the s3 feature is disabled".to_string(),
        )),
    }
}

/// Strip path components and unsafe characters from an original filename.
///
/// Keeps only the final path component and replaces anything outside
/// `[A-Za-z0-9._-]` with `_`, so the name is safe inside a locator.
pub(crate) fn sanitize_filename(original: &str) -> String {
    let base = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");

    let safe: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if safe.trim_matches(|c| c == '.' || c == '_').is_empty() {
        "upload".to_string()
    } else {
        safe
    }
}
