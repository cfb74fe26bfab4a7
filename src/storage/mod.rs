//! Object storage backends
//!
//! The [`BlobStore`] trait is the seam between folder uploads and the bucket
//! they write to. Two implementations are provided:
//!
//! - [`GcsBlobStore`]: Google Cloud Storage via the JSON API
//! - [`LocalBlobStore`]: a directory per bucket on the local filesystem

mod gcs;
mod local;
mod traits;

pub use gcs::{GcsBlobStore, TokenSource};
pub use local::LocalBlobStore;
pub use traits::BlobStore;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use std::sync::Arc;

/// Build the configured store, or `None` while no bucket is configured
pub fn from_config(config: &StorageConfig) -> Result<Option<Arc<dyn BlobStore>>> {
    let Some(bucket) = config.bucket.as_deref() else {
        return Ok(None);
    };

    let store: Arc<dyn BlobStore> = match config.backend {
        StorageBackend::Gcs => {
            let token_source = match &config.access_token {
                Some(token) => TokenSource::Static(token.clone()),
                None => TokenSource::Metadata(config.metadata_endpoint.clone()),
            };
            Arc::new(GcsBlobStore::new(
                config.gcs_endpoint.clone(),
                bucket,
                token_source,
            )?)
        }
        StorageBackend::Local => Arc::new(LocalBlobStore::new(config.local_root.clone(), bucket)),
    };

    tracing::info!(backend = store.name(), bucket = %bucket, "Object storage configured");
    Ok(Some(store))
}
