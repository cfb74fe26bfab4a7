//! Object storage abstraction

use crate::error::StorageError;
use async_trait::async_trait;
use std::path::Path;

/// Trait for object storage backends
///
/// A store writes local files into one bucket under a caller-chosen blob
/// name. Implementations classify failures with [`StorageError`] so callers
/// can tell permission problems apart from transfer problems.
///
/// # Examples
///
/// ```no_run
/// use media_relay::storage::{BlobStore, LocalBlobStore};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalBlobStore::new("buckets", "media");
/// store.put_file(Path::new("clip.mp4"), "uploads/clip.mp4").await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload the file at `local` as `blob`, replacing any existing object
    ///
    /// # Errors
    ///
    /// - [`StorageError::PermissionDenied`] when the file cannot be read or
    ///   the bucket refuses the write
    /// - [`StorageError::Auth`] when credentials cannot be obtained
    /// - [`StorageError::Transfer`] for any other rejected or failed upload
    async fn put_file(&self, local: &Path, blob: &str) -> Result<(), StorageError>;

    /// Bucket the store writes into
    fn bucket(&self) -> &str;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
