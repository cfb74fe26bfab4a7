//! Google Cloud Storage backend over the JSON API
//!
//! Objects are written with single-request media uploads. Credentials come
//! from a static access token when configured, otherwise from the instance
//! metadata server, cached until shortly before they expire.

use super::BlobStore;
use crate::error::StorageError;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::io::ReaderStream;

/// HTTP timeout for token requests
const TOKEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Tokens are refreshed this long before their reported expiry
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Where access tokens come from
#[derive(Clone)]
pub enum TokenSource {
    /// A fixed token supplied by configuration
    Static(String),
    /// The GCE/Cloud Run metadata server at this base URL
    Metadata(String),
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

#[derive(Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Store writing into a Google Cloud Storage bucket
pub struct GcsBlobStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    token_source: TokenSource,
    cached: Mutex<Option<CachedToken>>,
}

impl GcsBlobStore {
    /// Create a store for `bucket` at the JSON API base URL `endpoint`
    ///
    /// # Errors
    /// Returns [`StorageError::Transfer`] if the HTTP client cannot be built
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        token_source: TokenSource,
    ) -> Result<Self, StorageError> {
        let bucket = bucket.into();
        let client = reqwest::Client::builder()
            .user_agent(concat!("media-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StorageError::Transfer {
                blob: String::new(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket,
            token_source,
            cached: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, StorageError> {
        let metadata_base = match &self.token_source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Metadata(base) => base,
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.value.clone());
        }

        let url = format!(
            "{}{}",
            metadata_base.trim_end_matches('/'),
            METADATA_TOKEN_PATH
        );
        let response = self
            .client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .timeout(TOKEN_TIMEOUT)
            .send()
            .await
            .map_err(|e| StorageError::Auth(format!("metadata server unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(StorageError::Auth(format!(
                "metadata server returned {}",
                response.status()
            )));
        }

        let token: MetadataToken = response
            .json()
            .await
            .map_err(|e| StorageError::Auth(format!("invalid token response: {}", e)))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        tracing::debug!(expires_in = token.expires_in, "Obtained storage access token");

        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn put_file(&self, local: &Path, blob: &str) -> Result<(), StorageError> {
        let file = tokio::fs::File::open(local)
            .await
            .map_err(|e| StorageError::from_io(local, e))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| StorageError::from_io(local, e))?
            .len();

        let token = self.access_token().await?;
        let url = format!(
            "{}/upload/storage/v1/b/{}/o",
            self.endpoint,
            urlencoding::encode(&self.bucket)
        );

        let response = self
            .client
            .post(&url)
            .query(&[("uploadType", "media"), ("name", blob)])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .header(reqwest::header::CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .map_err(|e| StorageError::Transfer {
                blob: blob.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::trace!(blob = %blob, bytes = size, "Uploaded object");
            return Ok(());
        }

        // Bucket-side rejections (401/403 included) are transfer failures;
        // permission errors are reserved for local reads
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::Transfer {
            blob: blob.to_string(),
            reason: format!("{} {}", status, body.trim()),
        })
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn name(&self) -> &'static str {
        "gcs"
    }
}
