//! Background reclamation of expired shared files.
//!
//! This module provides the background task that periodically sweeps file
//! records whose share expiry has passed, deleting the stored object and
//! then the metadata row.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use crate::datetime::fmt_utc;
use crate::db::{Database, FileRepository};
use crate::storage::StorageBackend;
use crate::FiledropError;

/// Default sweep interval in seconds (1 hour).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Expired-share reclamation worker.
///
/// This struct manages a background task that periodically finds files
/// whose share expiry has passed and removes them, object first.
pub struct ReclamationWorker {
    db: Arc<Database>,
    storage: Arc<dyn StorageBackend>,
    sweep_interval: Duration,
}

impl ReclamationWorker {
    /// Create a new ReclamationWorker with the given database and storage.
    pub fn new(db: Arc<Database>, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            db,
            storage,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }

    /// Create a new ReclamationWorker with a custom sweep interval.
    pub fn with_interval(
        db: Arc<Database>,
        storage: Arc<dyn StorageBackend>,
        interval_secs: u64,
    ) -> Self {
        Self {
            db,
            storage,
            sweep_interval: Duration::from_secs(interval_secs),
        }
    }

    /// Run the reclamation loop.
    ///
    /// This method runs indefinitely, sweeping expired records at the
    /// configured interval. The first sweep happens immediately.
    pub async fn run(&self) {
        info!(
            "reclamation worker started (sweep interval: {} seconds)",
            self.sweep_interval.as_secs()
        );

        let mut timer = interval(self.sweep_interval);

        loop {
            timer.tick().await;
            self.sweep().await;
        }
    }

    /// Sweep all records whose share expiry has passed.
    pub async fn sweep(&self) {
        self.sweep_at(Utc::now()).await;
    }

    /// Sweep against an explicit clock. Exposed for deterministic sweeps.
    ///
    /// Each record is handled independently: a failure on one never stops
    /// the sweep, and nothing here is retried within a cycle. Work that
    /// fails is picked up again on the next sweep.
    pub async fn sweep_at(&self, now: DateTime<Utc>) {
        debug!("checking for expired shared files");

        let repo = FileRepository::new(self.db.pool());
        let expired = match repo.list_expired(&fmt_utc(now)).await {
            Ok(records) => records,
            Err(e) => {
                error!("failed to list expired files: {e}");
                return;
            }
        };

        if expired.is_empty() {
            debug!("no expired shared files");
            return;
        }

        info!("reclaiming {} expired file(s)", expired.len());

        let mut reclaimed = 0;
        for record in expired {
            // Object first, row second: a row without an object is cheap to
            // skip next cycle, an object without a row is unreachable.
            match self.storage.delete(&record.locator).await {
                Ok(()) => {}
                Err(FiledropError::NotFound(_)) => {
                    // Already gone, likely a prior partial sweep.
                }
                Err(e) => {
                    warn!(
                        file_id = record.id,
                        locator = %record.locator,
                        "failed to delete stored object, will retry next sweep: {e}"
                    );
                    continue;
                }
            }

            match repo.delete_by_id(record.id).await {
                Ok(_) => reclaimed += 1,
                Err(e) => {
                    warn!(file_id = record.id, "failed to delete expired record: {e}");
                }
            }
        }

        info!("reclaimed {reclaimed} expired file(s)");
    }
}

/// Start the reclamation worker as a background task.
pub fn start_reclamation_worker(
    db: Arc<Database>,
    storage: Arc<dyn StorageBackend>,
    interval_secs: u64,
) {
    let worker = ReclamationWorker::with_interval(db, storage, interval_secs);
    tokio::spawn(async move {
        worker.run().await;
    });
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::cache::CacheLayer;
    use crate::db::{NewUser, UserRepository};
    use crate::service::FileService;
    use crate::storage::LocalStorage;
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, FileService, ReclamationWorker, Arc<Database>) {
        let dir = TempDir::new().unwrap();
        let storage: Arc<dyn StorageBackend> = Arc::new(
            LocalStorage::new(dir.path(), "http://localhost:8080/uploads").unwrap(),
        );
        let db = Arc::new(Database::open_in_memory().await.unwrap());

        UserRepository::new(db.pool())
            .create(&NewUser {
                username: "alice".to_string(),
                password: "hash".to_string(),
            })
            .await
            .unwrap();

        let service = FileService::new(
            db.clone(),
            storage.clone(),
            CacheLayer::new(None),
            "http://localhost:8080",
            Duration::from_secs(300),
        );
        let worker = ReclamationWorker::new(db.clone(), storage);
        (dir, service, worker, db)
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_object_and_row() {
        let (dir, service, worker, _db) = setup().await;

        let record = service
            .upload(1, "report.pdf", None, &[0u8; 1200])
            .await
            .unwrap();
        let grant = service.share(1, record.id).await.unwrap();
        assert!(dir.path().join(&record.locator).exists());

        let later = Utc::now() + ChronoDuration::hours(25);
        worker.sweep_at(later).await;

        assert!(!dir.path().join(&record.locator).exists());
        assert!(service.list(1).await.unwrap().is_empty());

        let err = service
            .resolve_shared_at(&grant.token, later)
            .await
            .unwrap_err();
        assert!(matches!(err, FiledropError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_sweep_leaves_live_and_private_files() {
        let (dir, service, worker, _db) = setup().await;

        let private = service.upload(1, "private.txt", None, b"p").await.unwrap();
        let shared = service.upload(1, "shared.txt", None, b"s").await.unwrap();
        service.share(1, shared.id).await.unwrap();

        // Inside the share horizon nothing qualifies.
        worker.sweep_at(Utc::now() + ChronoDuration::hours(23)).await;

        assert!(dir.path().join(&private.locator).exists());
        assert!(dir.path().join(&shared.locator).exists());
        assert_eq!(service.list(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sweep_tolerates_already_deleted_object() {
        let (dir, service, worker, _db) = setup().await;

        let record = service.upload(1, "gone.txt", None, b"x").await.unwrap();
        service.share(1, record.id).await.unwrap();

        // Simulate a prior partial sweep that removed only the object.
        tokio::fs::remove_file(dir.path().join(&record.locator))
            .await
            .unwrap();

        worker.sweep_at(Utc::now() + ChronoDuration::hours(25)).await;

        // The orphaned row is still reclaimed.
        assert!(service.list(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_sweeps_are_idempotent() {
        let (_dir, service, worker, _db) = setup().await;

        let record = service.upload(1, "once.txt", None, b"x").await.unwrap();
        service.share(1, record.id).await.unwrap();

        let later = Utc::now() + ChronoDuration::hours(25);
        worker.sweep_at(later).await;
        worker.sweep_at(later).await;

        assert!(service.list(1).await.unwrap().is_empty());
    }
}
