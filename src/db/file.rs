//! File metadata entity and repository.
//!
//! The `files` table is the source of truth for stored objects. The storage
//! backends own the bytes; the listing cache owns nothing.

use sqlx::FromRow;

use super::DbPool;
use crate::{FiledropError, Result};

/// Metadata for one stored object.
///
/// `locator` and `owner_id` are immutable after creation. `share_token` is
/// set iff `is_public`; an elapsed `expires_at` makes the record publicly
/// unresolvable even while `is_public` is still true (lazy expiry), until the
/// reclamation worker removes it.
#[derive(Debug, Clone, FromRow)]
pub struct FileRecord {
    /// Unique file ID.
    pub id: i64,
    /// Owning user ID.
    pub owner_id: i64,
    /// Original display name.
    pub name: String,
    /// Size in bytes.
    pub size: i64,
    /// MIME content type.
    pub content_type: String,
    /// Backend-specific locator (path or object key).
    pub locator: String,
    /// Whether the file has been shared publicly.
    pub is_public: bool,
    /// Opaque share token, unique when set.
    pub share_token: Option<String>,
    /// Share expiry timestamp.
    pub expires_at: Option<String>,
    /// When the record was created.
    pub created_at: String,
    /// When the record was last updated.
    pub updated_at: String,
}

/// Data for creating a new file record.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    /// Owning user ID.
    pub owner_id: i64,
    /// Original display name.
    pub name: String,
    /// Size in bytes.
    pub size: i64,
    /// MIME content type.
    pub content_type: String,
    /// Backend-specific locator.
    pub locator: String,
}

const FILE_COLUMNS: &str = "id, owner_id, name, size, content_type, locator, is_public, \
     share_token, expires_at, created_at, updated_at";

/// Repository for file metadata operations.
///
/// Every mutation is a single statement, so each is fully applied or not
/// applied; no in-process locking is needed around records.
pub struct FileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new file record.
    pub async fn create(&self, file: &NewFileRecord) -> Result<FileRecord> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO files (owner_id, name, size, content_type, locator)
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(file.owner_id)
        .bind(&file.name)
        .bind(file.size)
        .bind(&file.content_type)
        .bind(&file.locator)
        .fetch_one(self.pool)
        .await?;

        self.get_unscoped(id)
            .await?
            .ok_or_else(|| FiledropError::NotFound("file".to_string()))
    }

    /// Get a file by ID, scoped to its owner.
    ///
    /// A file owned by someone else is indistinguishable from a missing one.
    pub async fn get_by_id(&self, id: i64, owner_id: i64) -> Result<Option<FileRecord>> {
        let query =
            format!("SELECT {FILE_COLUMNS} FROM files WHERE id = $1 AND owner_id = $2");
        let file = sqlx::query_as::<_, FileRecord>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(file)
    }

    /// List all files for an owner, newest first.
    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<FileRecord>> {
        let query = format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE owner_id = $1 ORDER BY id DESC"
        );
        let files = sqlx::query_as::<_, FileRecord>(&query)
            .bind(owner_id)
            .fetch_all(self.pool)
            .await?;

        Ok(files)
    }

    /// Search an owner's files by name substring.
    pub async fn search(&self, owner_id: i64, query_str: &str) -> Result<Vec<FileRecord>> {
        let query = format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE owner_id = $1 AND name LIKE '%' || $2 || '%' ORDER BY id DESC"
        );
        let files = sqlx::query_as::<_, FileRecord>(&query)
            .bind(owner_id)
            .bind(query_str)
            .fetch_all(self.pool)
            .await?;

        Ok(files)
    }

    /// Mark an owned file public with a share token and expiry, atomically.
    ///
    /// Returns false when the (id, owner) pair matched no row.
    pub async fn make_public(
        &self,
        id: i64,
        owner_id: i64,
        token: &str,
        expires_at: &str,
        now: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE files SET is_public = $1, share_token = $2, expires_at = $3, updated_at = $4
             WHERE id = $5 AND owner_id = $6",
        )
        .bind(true)
        .bind(token)
        .bind(expires_at)
        .bind(now)
        .bind(id)
        .bind(owner_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete an owned file record. Idempotent: returns rows affected.
    pub async fn delete(&self, id: i64, owner_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete a file record regardless of owner. Used by reclamation.
    pub async fn delete_by_id(&self, id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Look up a file by share token.
    ///
    /// Liveness (visibility and expiry) is deliberately NOT checked here;
    /// callers apply [`crate::share::is_live`] so retrieval and reclamation
    /// share one authority.
    pub async fn get_by_share_token(&self, token: &str) -> Result<Option<FileRecord>> {
        let query = format!("SELECT {FILE_COLUMNS} FROM files WHERE share_token = $1");
        let file = sqlx::query_as::<_, FileRecord>(&query)
            .bind(token)
            .fetch_optional(self.pool)
            .await?;

        Ok(file)
    }

    /// List every record whose share expiry has passed the given instant.
    pub async fn list_expired(&self, now: &str) -> Result<Vec<FileRecord>> {
        let query = format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE expires_at IS NOT NULL AND expires_at < $1 ORDER BY id"
        );
        let files = sqlx::query_as::<_, FileRecord>(&query)
            .bind(now)
            .fetch_all(self.pool)
            .await?;

        Ok(files)
    }

    async fn get_unscoped(&self, id: i64) -> Result<Option<FileRecord>> {
        let query = format!("SELECT {FILE_COLUMNS} FROM files WHERE id = $1");
        let file = sqlx::query_as::<_, FileRecord>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(file)
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::datetime::fmt_utc;
    use crate::db::{Database, NewUser, UserRepository};
    use chrono::{Duration, Utc};

    async fn setup_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        let users = UserRepository::new(db.pool());
        users
            .create(&NewUser {
                username: "owner".to_string(),
                password: "hash".to_string(),
            })
            .await
            .unwrap();
        users
            .create(&NewUser {
                username: "other".to_string(),
                password: "hash".to_string(),
            })
            .await
            .unwrap();
        db
    }

    fn sample_file(owner_id: i64, name: &str) -> NewFileRecord {
        NewFileRecord {
            owner_id,
            name: name.to_string(),
            size: 1200,
            content_type: "application/pdf".to_string(),
            locator: format!("1/{name}"),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let file = repo.create(&sample_file(1, "report.pdf")).await.unwrap();
        assert_eq!(file.name, "report.pdf");
        assert_eq!(file.size, 1200);
        assert!(!file.is_public);
        assert!(file.share_token.is_none());
        assert!(file.expires_at.is_none());

        let found = repo.get_by_id(file.id, 1).await.unwrap().unwrap();
        assert_eq!(found.locator, file.locator);
    }

    #[tokio::test]
    async fn test_get_scoped_to_owner() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let file = repo.create(&sample_file(1, "secret.txt")).await.unwrap();

        // Another owner sees absence, same as a nonexistent id.
        assert!(repo.get_by_id(file.id, 2).await.unwrap().is_none());
        assert!(repo.get_by_id(9999, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_owner() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        repo.create(&sample_file(1, "a.txt")).await.unwrap();
        repo.create(&sample_file(1, "b.txt")).await.unwrap();
        repo.create(&sample_file(2, "c.txt")).await.unwrap();

        let files = repo.list_by_owner(1).await.unwrap();
        assert_eq!(files.len(), 2);
        // Newest first
        assert_eq!(files[0].name, "b.txt");
        assert_eq!(files[1].name, "a.txt");
    }

    #[tokio::test]
    async fn test_search_substring() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        repo.create(&sample_file(1, "quarterly-report.pdf")).await.unwrap();
        repo.create(&sample_file(1, "photo.jpg")).await.unwrap();

        let hits = repo.search(1, "report").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "quarterly-report.pdf");

        assert!(repo.search(1, "missing").await.unwrap().is_empty());
        // Scoped: other owner finds nothing
        assert!(repo.search(2, "report").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_make_public() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let file = repo.create(&sample_file(1, "shared.txt")).await.unwrap();
        let now = fmt_utc(Utc::now());
        let expires = fmt_utc(Utc::now() + Duration::hours(24));

        let updated = repo
            .make_public(file.id, 1, "tok-abc", &expires, &now)
            .await
            .unwrap();
        assert!(updated);

        let found = repo.get_by_id(file.id, 1).await.unwrap().unwrap();
        assert!(found.is_public);
        assert_eq!(found.share_token.as_deref(), Some("tok-abc"));
        assert_eq!(found.expires_at.as_deref(), Some(expires.as_str()));
    }

    #[tokio::test]
    async fn test_make_public_wrong_owner() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let file = repo.create(&sample_file(1, "mine.txt")).await.unwrap();
        let now = fmt_utc(Utc::now());

        let updated = repo
            .make_public(file.id, 2, "tok", &now, &now)
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_delete_idempotent() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let file = repo.create(&sample_file(1, "gone.txt")).await.unwrap();

        assert_eq!(repo.delete(file.id, 1).await.unwrap(), 1);
        // Second delete is a success-shaped no-op.
        assert_eq!(repo.delete(file.id, 1).await.unwrap(), 0);
        assert_eq!(repo.delete_by_id(file.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_by_share_token_ignores_liveness() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let file = repo.create(&sample_file(1, "old.txt")).await.unwrap();
        let past = fmt_utc(Utc::now() - Duration::hours(1));
        let now = fmt_utc(Utc::now());
        repo.make_public(file.id, 1, "expired-tok", &past, &now)
            .await
            .unwrap();

        // Repository returns the row even when expired; liveness is the
        // caller's concern.
        let found = repo.get_by_share_token("expired-tok").await.unwrap();
        assert!(found.is_some());
        assert!(repo.get_by_share_token("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_expired() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let expired = repo.create(&sample_file(1, "expired.txt")).await.unwrap();
        let live = repo.create(&sample_file(1, "live.txt")).await.unwrap();
        let unshared = repo.create(&sample_file(1, "private.txt")).await.unwrap();

        let now = fmt_utc(Utc::now());
        let past = fmt_utc(Utc::now() - Duration::hours(2));
        let future = fmt_utc(Utc::now() + Duration::hours(2));

        repo.make_public(expired.id, 1, "t1", &past, &now).await.unwrap();
        repo.make_public(live.id, 1, "t2", &future, &now).await.unwrap();

        let hits = repo.list_expired(&now).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, expired.id);
        assert_ne!(hits[0].id, unshared.id);
    }
}
