//! Local filesystem storage backend.
//!
//! Files live under `{root}/{owner_id}/{uuid}_{name}`. Writes go to a
//! temporary sibling first and become visible only through a rename, so a
//! half-written upload is never resolvable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use super::{sanitize_filename, StorageBackend};
use crate::{FiledropError, Result};

/// Local-disk storage variant.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    /// Base directory for stored files.
    root: PathBuf,
    /// URL prefix of the service's own serving root.
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at `root`.
    ///
    /// The root directory is created if it does not exist.
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        Ok(Self {
            root,
            base_url: base_url.into(),
        })
    }

    /// Get the storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a locator to its on-disk path, rejecting traversal.
    fn path_for(&self, locator: &str) -> Result<PathBuf> {
        for component in Path::new(locator).components() {
            if matches!(component, std::path::Component::ParentDir) {
                return Err(FiledropError::InvalidInput(
                    "locator must not contain parent components".to_string(),
                ));
            }
        }
        Ok(self.root.join(locator))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn store(&self, data: &[u8], owner_id: i64, original_name: &str) -> Result<String> {
        let safe_name = sanitize_filename(original_name);
        let unique = Uuid::new_v4().simple().to_string();
        let locator = format!("{owner_id}/{}_{safe_name}", &unique[..8]);

        let final_path = self.root.join(&locator);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write-then-rename keeps a mid-write failure invisible.
        let tmp_path = final_path.with_file_name(format!(".{unique}.tmp"));
        let mut file = fs::File::create(&tmp_path).await?;
        if let Err(e) = file.write_all(data).await {
            drop(file);
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        file.flush().await?;
        drop(file);
        fs::rename(&tmp_path, &final_path).await?;

        debug!(locator = %locator, size = data.len(), "file stored locally");
        Ok(locator)
    }

    async fn resolve_url(&self, locator: &str, _ttl: Duration) -> Result<String> {
        // The local variant hands out stable unsigned paths; ttl is ignored.
        let path = self.path_for(locator)?;
        if !path.exists() {
            return Err(FiledropError::NotFound("file".to_string()));
        }

        Ok(format!(
            "{}/{locator}",
            self.base_url.trim_end_matches('/')
        ))
    }

    async fn delete(&self, locator: &str) -> Result<()> {
        let path = self.path_for(locator)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(locator = %locator, "file deleted locally");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn kind(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let storage =
            LocalStorage::new(dir.path(), "http://localhost:8080/uploads").unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_store_and_resolve() {
        let (_dir, storage) = setup();

        let locator = storage.store(b"hello", 10, "greeting.txt").await.unwrap();
        assert!(locator.starts_with("10/"));
        assert!(locator.ends_with("_greeting.txt"));

        let url = storage
            .resolve_url(&locator, Duration::from_secs(900))
            .await
            .unwrap();
        assert_eq!(url, format!("http://localhost:8080/uploads/{locator}"));

        let on_disk = tokio::fs::read(storage.root().join(&locator)).await.unwrap();
        assert_eq!(on_disk, b"hello");
    }

    #[tokio::test]
    async fn test_same_name_never_collides() {
        let (_dir, storage) = setup();

        let a = storage.store(b"first", 10, "report.pdf").await.unwrap();
        let b = storage.store(b"second", 10, "report.pdf").await.unwrap();

        assert_ne!(a, b);
        assert_eq!(tokio::fs::read(storage.root().join(&a)).await.unwrap(), b"first");
        assert_eq!(tokio::fs::read(storage.root().join(&b)).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_concurrent_same_name_uploads() {
        let (_dir, storage) = setup();

        let (a, b) = tokio::join!(
            storage.store(b"one", 7, "clash.bin"),
            storage.store(b"two", 7, "clash.bin"),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a, b);
        assert!(storage.root().join(&a).exists());
        assert!(storage.root().join(&b).exists());
    }

    #[tokio::test]
    async fn test_no_temp_artifacts_left() {
        let (_dir, storage) = setup();

        let locator = storage.store(b"data", 3, "clean.txt").await.unwrap();
        let owner_dir = storage.root().join("3");

        let mut entries = tokio::fs::read_dir(&owner_dir).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names.len(), 1);
        assert!(locator.ends_with(&names[0]));
    }

    #[tokio::test]
    async fn test_resolve_missing_is_not_found() {
        let (_dir, storage) = setup();

        let err = storage
            .resolve_url("10/nope.txt", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, FiledropError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_rejects_traversal() {
        let (_dir, storage) = setup();

        let err = storage
            .resolve_url("../outside.txt", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, FiledropError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_idempotent() {
        let (_dir, storage) = setup();

        let locator = storage.store(b"bye", 4, "bye.txt").await.unwrap();
        storage.delete(&locator).await.unwrap();
        assert!(!storage.root().join(&locator).exists());

        // Deleting again is a no-op, not an error.
        storage.delete(&locator).await.unwrap();
    }
}
