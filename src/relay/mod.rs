//! Service facade tying the job registry, download orchestrator and folder
//! uploader together.
//!
//! [`MediaRelay`] is what the HTTP layer talks to. Submodules:
//! - [`lifecycle`] - job eviction sweeper and graceful shutdown

mod lifecycle;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{CompletedUpload, FetchTool, Fetcher};
use crate::registry::JobRegistry;
use crate::storage::{self, BlobStore};
use crate::types::{DownloadAccepted, Event, Job, JobId, UploadSummary};
use crate::upload::FolderUploader;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Events buffered per subscriber before it starts lagging
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Main service instance (cloneable - all fields are cheap handles)
#[derive(Clone)]
pub struct MediaRelay {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Job records, shared with the orchestrator and its reader tasks
    pub(crate) registry: Arc<JobRegistry>,
    /// Download orchestrator
    pub(crate) fetcher: Fetcher,
    /// Folder uploader, absent while no bucket is configured
    pub(crate) uploader: Option<FolderUploader>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Cancelled once by [`MediaRelay::shutdown`]
    pub(crate) shutdown_token: CancellationToken,
}

impl MediaRelay {
    /// Create a new service instance from configuration
    ///
    /// This method:
    /// - Validates the configuration
    /// - Creates the download directory
    /// - Resolves the yt-dlp binary (explicit path, else PATH lookup)
    /// - Builds the object store when a bucket is configured
    ///
    /// A missing binary or bucket is logged, not fatal: downloads then fail
    /// on their job record and uploads are rejected per request.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        let tool = FetchTool::from_config(&config.tool);
        match &tool {
            Some(tool) => {
                tracing::info!(binary = %tool.binary_path().display(), "Fetch tool resolved");
            }
            None => {
                tracing::warn!(
                    "yt-dlp not found; downloads will fail until tool.binary_path is set or it is installed in PATH"
                );
            }
        }

        let store = storage::from_config(&config.storage)?;
        if store.is_none() {
            tracing::warn!("No storage bucket configured; folder uploads will be rejected");
        }

        Ok(Self::with_components(config, tool, store))
    }

    /// Assemble a service from already-resolved parts
    pub fn with_components(
        config: Config,
        tool: Option<FetchTool>,
        store: Option<Arc<dyn BlobStore>>,
    ) -> Self {
        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let registry = Arc::new(JobRegistry::new());

        let mut fetcher = Fetcher::new(
            registry.clone(),
            tool,
            config.download.download_dir.clone(),
            event_tx.clone(),
        );
        if config.storage.upload_completed {
            match &store {
                Some(store) => {
                    fetcher = fetcher.with_completed_upload(CompletedUpload {
                        store: store.clone(),
                        prefix: config.storage.download_prefix.clone(),
                    });
                }
                None => {
                    tracing::warn!("upload_completed is set but no bucket is configured; ignoring");
                }
            }
        }

        let uploader = store.map(|store| FolderUploader::new(store, config.storage.upload_concurrency));

        Self {
            config: Arc::new(config),
            registry,
            fetcher,
            uploader,
            event_tx,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Subscribe to job events
    ///
    /// Each subscriber receives every event independently. A subscriber that
    /// falls behind by more than 1000 events gets `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Whether [`MediaRelay::shutdown`] has been called
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Accept a download of `url`
    ///
    /// Returns immediately with the job id, or waits for the job to finish when
    /// `download.wait_for_completion` is set.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] when `url` is missing or blank
    /// - [`Error::ShuttingDown`] after shutdown began
    pub async fn download(&self, url: Option<&str>) -> Result<DownloadAccepted> {
        if self.is_shutting_down() {
            return Err(Error::ShuttingDown);
        }

        if self.config.download.wait_for_completion {
            self.fetcher.download_blocking(url).await
        } else {
            let job_id = self.fetcher.start_download(url).await?;
            Ok(DownloadAccepted {
                job_id,
                filename: None,
            })
        }
    }

    /// Snapshot of one job
    pub async fn job_status(&self, id: &JobId) -> Result<Job> {
        self.registry.get(id).await
    }

    /// Snapshots of every tracked job, oldest first
    pub async fn list_jobs(&self) -> Vec<Job> {
        self.registry.list().await
    }

    /// Upload a local folder into the configured bucket
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when no bucket is configured
    /// - [`Error::SourceFolderNotFound`] when `source` is not a directory
    pub async fn upload_folder(&self, source: &Path, prefix: &str) -> Result<UploadSummary> {
        self.folder_uploader()?.upload_folder(source, prefix).await
    }

    /// The folder uploader, or a configuration error while no bucket is set
    pub fn folder_uploader(&self) -> Result<&FolderUploader> {
        match (&self.uploader, self.config.require_bucket()) {
            (Some(uploader), _) => Ok(uploader),
            (None, Err(e)) => Err(e),
            (None, Ok(bucket)) => Err(Error::Config {
                message: format!("storage for bucket '{}' is unavailable", bucket),
                key: Some("storage.backend".into()),
            }),
        }
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server listens on `server.bind_address` and stops gracefully once
    /// [`MediaRelay::shutdown`] is called.
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let relay = self.clone();
        tokio::spawn(async move { crate::api::start_api_server(relay).await })
    }

    /// Run the REST API server on the current task until shutdown
    pub async fn serve(self: &Arc<Self>) -> Result<()> {
        crate::api::start_api_server(self.clone()).await
    }
}
