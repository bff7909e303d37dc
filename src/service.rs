//! File lifecycle orchestration.
//!
//! `FileService` ties the storage backend, metadata store, listing cache and
//! share tokens together. Every operation takes the authenticated owner id
//! as an explicit argument; nothing here reads ambient request state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::CacheLayer;
use crate::datetime::{fmt_utc, to_rfc3339};
use crate::db::{Database, FileRecord, FileRepository, NewFileRecord};
use crate::share::{self, RESOLVE_TTL_SECS};
use crate::storage::StorageBackend;
use crate::{FiledropError, Result};

/// One file in a listing or search response.
///
/// Field names are part of the API contract; do not rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSummary {
    pub id: i64,
    pub name: String,
    pub size: i64,
    #[serde(rename = "type")]
    pub content_type: String,
    pub url: String,
    pub is_public: bool,
    pub created_at: String,
}

/// Result of a share operation.
#[derive(Debug, Clone, Serialize)]
pub struct ShareGrant {
    pub share_url: String,
    #[serde(skip)]
    pub token: String,
    #[serde(skip)]
    pub expires_at: String,
}

/// High-level file operations.
#[derive(Clone)]
pub struct FileService {
    db: Arc<Database>,
    storage: Arc<dyn StorageBackend>,
    cache: CacheLayer,
    base_url: String,
    listing_ttl: Duration,
}

impl FileService {
    /// Create a new FileService.
    pub fn new(
        db: Arc<Database>,
        storage: Arc<dyn StorageBackend>,
        cache: CacheLayer,
        base_url: impl Into<String>,
        listing_ttl: Duration,
    ) -> Self {
        Self {
            db,
            storage,
            cache,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            listing_ttl,
        }
    }

    /// Store an upload and persist its metadata.
    ///
    /// The storage write strictly precedes the metadata write, so a record
    /// never points at bytes that were not fully stored. If metadata
    /// persistence fails afterwards, the orphaned object is left in place
    /// and logged; that path is reconciled manually, not compensated.
    pub async fn upload(
        &self,
        owner_id: i64,
        original_name: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<FileRecord> {
        if original_name.trim().is_empty() {
            return Err(FiledropError::InvalidInput("file name is required".to_string()));
        }

        let content_type = match content_type {
            Some(ct) if !ct.is_empty() => ct.to_string(),
            _ => mime_guess::from_path(original_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };

        let locator = self.storage.store(data, owner_id, original_name).await?;

        let record = FileRepository::new(self.db.pool())
            .create(&NewFileRecord {
                owner_id,
                name: original_name.to_string(),
                size: data.len() as i64,
                content_type,
                locator: locator.clone(),
            })
            .await
            .inspect_err(|e| {
                warn!(
                    locator = %locator,
                    error = %e,
                    "metadata write failed after storage write; object orphaned"
                );
            })?;

        // Synchronous invalidation before returning gives this owner
        // read-your-writes on the next listing fetch.
        self.cache.invalidate(owner_id).await;

        info!(file_id = record.id, owner_id, size = record.size, "file uploaded");
        Ok(record)
    }

    /// List an owner's files, read-through against the listing cache.
    pub async fn list(&self, owner_id: i64) -> Result<Vec<FileSummary>> {
        if let Some(cached) = self.cache.get_listing(owner_id).await {
            match serde_json::from_str::<Vec<FileSummary>>(&cached) {
                Ok(summaries) => return Ok(summaries),
                Err(e) => warn!(owner_id, error = %e, "discarding undecodable cached listing"),
            }
        }

        let records = FileRepository::new(self.db.pool())
            .list_by_owner(owner_id)
            .await?;
        let summaries = self.to_summaries(records).await;

        // Best-effort repopulation; a failure here must not fail the request.
        if let Ok(payload) = serde_json::to_string(&summaries) {
            self.cache
                .set_listing(owner_id, &payload, self.listing_ttl)
                .await;
        }

        Ok(summaries)
    }

    /// Search an owner's files by name substring. Uncached.
    pub async fn search(&self, owner_id: i64, query: &str) -> Result<Vec<FileSummary>> {
        if query.trim().is_empty() {
            return Err(FiledropError::InvalidInput(
                "search query is required".to_string(),
            ));
        }

        let records = FileRepository::new(self.db.pool())
            .search(owner_id, query)
            .await?;
        Ok(self.to_summaries(records).await)
    }

    /// Share an owned file publicly for the fixed 24h horizon.
    ///
    /// A file owned by someone else fails with `NotFound`, never with a
    /// forbidden-style error, so existence is not confirmed to non-owners.
    pub async fn share(&self, owner_id: i64, file_id: i64) -> Result<ShareGrant> {
        let repo = FileRepository::new(self.db.pool());

        repo.get_by_id(file_id, owner_id)
            .await?
            .ok_or_else(|| FiledropError::NotFound("file".to_string()))?;

        let token = share::issue_token();
        let now = Utc::now();
        let expires_at = fmt_utc(share::expiry_from(now));

        // One atomic update; the owner check races a concurrent delete, in
        // which case zero rows match and we report absence.
        let updated = repo
            .make_public(file_id, owner_id, &token, &expires_at, &fmt_utc(now))
            .await?;
        if !updated {
            return Err(FiledropError::NotFound("file".to_string()));
        }

        info!(file_id, owner_id, "file shared");
        Ok(ShareGrant {
            share_url: format!("{}/share/{token}", self.base_url),
            token,
            expires_at,
        })
    }

    /// Delete an owned file's metadata record.
    ///
    /// Idempotent: deleting an already-gone id succeeds. The stored object
    /// is not removed here; reclamation handles objects whose share expiry
    /// passes, and never-shared objects persist (documented simplification).
    pub async fn delete(&self, owner_id: i64, file_id: i64) -> Result<()> {
        let removed = FileRepository::new(self.db.pool())
            .delete(file_id, owner_id)
            .await?;

        self.cache.invalidate(owner_id).await;

        if removed > 0 {
            info!(file_id, owner_id, "file deleted");
        }
        Ok(())
    }

    /// Resolve a share token into a short-lived retrieval URL.
    pub async fn resolve_shared(&self, token: &str) -> Result<String> {
        self.resolve_shared_at(token, Utc::now()).await
    }

    /// Resolve a share token against an explicit clock.
    ///
    /// Absent, expired and private records are indistinguishable: all fail
    /// with the same `NotFound`.
    pub async fn resolve_shared_at(&self, token: &str, now: DateTime<Utc>) -> Result<String> {
        let record = FileRepository::new(self.db.pool())
            .get_by_share_token(token)
            .await?
            .ok_or_else(|| FiledropError::NotFound("file".to_string()))?;

        if !share::is_live(&record, now) {
            return Err(FiledropError::NotFound("file".to_string()));
        }

        self.storage
            .resolve_url(&record.locator, Duration::from_secs(RESOLVE_TTL_SECS))
            .await
    }

    /// Build the API-facing summary for one record, resolving its URL.
    ///
    /// A URL that fails to resolve degrades to an empty string rather than
    /// failing the whole response.
    pub async fn summarize(&self, record: FileRecord) -> FileSummary {
        let url = match self
            .storage
            .resolve_url(&record.locator, Duration::from_secs(RESOLVE_TTL_SECS))
            .await
        {
            Ok(url) => url,
            Err(e) => {
                warn!(file_id = record.id, error = %e, "failed to resolve listing url");
                String::new()
            }
        };
        FileSummary {
            id: record.id,
            name: record.name,
            size: record.size,
            content_type: record.content_type,
            url,
            is_public: record.is_public,
            created_at: to_rfc3339(&record.created_at),
        }
    }

    async fn to_summaries(&self, records: Vec<FileRecord>) -> Vec<FileSummary> {
        let mut summaries = Vec::with_capacity(records.len());
        for record in records {
            summaries.push(self.summarize(record).await);
        }
        summaries
    }
}
