//! Filesystem-backed bucket

use super::BlobStore;
use crate::error::StorageError;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Store that copies files into `<root>/<bucket>/<blob>`
///
/// Used for development and tests where no cloud bucket is available.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    bucket: String,
}

impl LocalBlobStore {
    /// Create a store for `bucket` below `root`
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
        }
    }

    /// Directory holding the bucket's objects
    pub fn bucket_dir(&self) -> PathBuf {
        self.root.join(&self.bucket)
    }

    fn object_path(&self, blob: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(blob);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if blob.is_empty() || escapes {
            return Err(StorageError::Transfer {
                blob: blob.to_string(),
                reason: "invalid object name".into(),
            });
        }
        Ok(self.bucket_dir().join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put_file(&self, local: &Path, blob: &str) -> Result<(), StorageError> {
        let target = self.object_path(blob)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::from_io(parent, e))?;
        }

        // Open first so an unreadable source is reported against the source path
        let mut source = tokio::fs::File::open(local)
            .await
            .map_err(|e| StorageError::from_io(local, e))?;
        let mut dest = tokio::fs::File::create(&target)
            .await
            .map_err(|e| StorageError::from_io(&target, e))?;
        tokio::io::copy(&mut source, &mut dest)
            .await
            .map_err(|e| StorageError::Transfer {
                blob: blob.to_string(),
                reason: e.to_string(),
            })?;

        tracing::trace!(blob = %blob, target = %target.display(), "Stored object");
        Ok(())
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_file_creates_nested_objects() {
        let src = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let file = src.path().join("a.txt");
        std::fs::write(&file, b"hello").unwrap();

        let store = LocalBlobStore::new(root.path(), "media");
        store.put_file(&file, "backup/x/a.txt").await.unwrap();

        let stored = root.path().join("media/backup/x/a.txt");
        assert_eq!(std::fs::read(stored).unwrap(), b"hello");
        assert_eq!(store.bucket(), "media");
    }

    #[tokio::test]
    async fn put_file_overwrites_existing_objects() {
        let src = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let file = src.path().join("a.txt");
        let store = LocalBlobStore::new(root.path(), "media");

        std::fs::write(&file, b"first").unwrap();
        store.put_file(&file, "a.txt").await.unwrap();
        std::fs::write(&file, b"second").unwrap();
        store.put_file(&file, "a.txt").await.unwrap();

        assert_eq!(
            std::fs::read(root.path().join("media/a.txt")).unwrap(),
            b"second"
        );
    }

    #[tokio::test]
    async fn object_names_cannot_escape_the_bucket() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(root.path(), "media");

        for blob in ["../escape.txt", "/abs.txt", "", "a/../../b"] {
            let err = store
                .put_file(Path::new("whatever"), blob)
                .await
                .unwrap_err();
            assert!(
                matches!(err, StorageError::Transfer { .. }),
                "{blob}: {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn missing_source_is_not_a_permission_error() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(root.path(), "media");
        let err = store
            .put_file(Path::new("/definitely/not/here.mp4"), "here.mp4")
            .await
            .unwrap_err();
        assert!(!err.is_permission_denied());
    }
}
