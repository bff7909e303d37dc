//! S3-compatible object storage backend.
//!
//! Locators are object keys. Retrieval URLs are presigned GETs valid for
//! exactly the requested TTL; the bucket itself never needs to be public.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;
use uuid::Uuid;

use super::{sanitize_filename, StorageBackend};
use crate::{FiledropError, Result};

/// Object-store storage variant.
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    /// Optional prefix prepended to every key.
    key_prefix: Option<String>,
}

impl S3Storage {
    /// Create a new S3Storage.
    ///
    /// Credentials come from the default AWS chain (env vars, config file,
    /// instance profile). `endpoint_url` supports S3-compatible services
    /// such as MinIO.
    pub async fn new(
        bucket: impl Into<String>,
        region: Option<&str>,
        endpoint_url: Option<&str>,
        key_prefix: Option<&str>,
    ) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        if let Some(endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let config = loader.load().await;
        let client = aws_sdk_s3::Client::new(&config);

        Ok(Self {
            client,
            bucket: bucket.into(),
            key_prefix: key_prefix.map(|p| p.trim_end_matches('/').to_string()),
        })
    }

    fn full_key(&self, locator: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{prefix}/{locator}"),
            None => locator.to_string(),
        }
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    async fn store(&self, data: &[u8], owner_id: i64, original_name: &str) -> Result<String> {
        let safe_name = sanitize_filename(original_name);
        let unique = Uuid::new_v4().simple().to_string();
        let locator = format!("{owner_id}/{}_{safe_name}", &unique[..8]);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.full_key(&locator))
            .content_length(data.len() as i64)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| FiledropError::Unavailable(format!("s3 put failed: {e}")))?;

        debug!(locator = %locator, size = data.len(), "object stored in s3");
        Ok(locator)
    }

    async fn resolve_url(&self, locator: &str, ttl: Duration) -> Result<String> {
        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|e| FiledropError::InvalidInput(format!("invalid url ttl: {e}")))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.full_key(locator))
            .presigned(presigning)
            .await
            .map_err(|e| FiledropError::Unavailable(format!("s3 presign failed: {e}")))?;

        Ok(request.uri().to_string())
    }

    async fn delete(&self, locator: &str) -> Result<()> {
        // DeleteObject succeeds for absent keys, so this is idempotent.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.full_key(locator))
            .send()
            .await
            .map_err(|e| FiledropError::Unavailable(format!("s3 delete failed: {e}")))?;

        debug!(locator = %locator, "object deleted from s3");
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "s3"
    }
}

impl std::fmt::Debug for S3Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Storage")
            .field("bucket", &self.bucket)
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Network-dependent behavior is covered by the LocalStorage tests through
    // the shared trait; here we only pin down key construction.
    #[tokio::test]
    async fn test_full_key_with_prefix() {
        let storage = S3Storage::new("bucket", Some("us-east-1"), None, Some("uploads/"))
            .await
            .unwrap();
        assert_eq!(storage.full_key("10/abc_report.pdf"), "uploads/10/abc_report.pdf");
    }

    #[tokio::test]
    async fn test_full_key_without_prefix() {
        let storage = S3Storage::new("bucket", Some("us-east-1"), None, None)
            .await
            .unwrap();
        assert_eq!(storage.full_key("10/abc_report.pdf"), "10/abc_report.pdf");
    }
}
