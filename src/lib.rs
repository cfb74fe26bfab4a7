//! # media-relay
//!
//! HTTP service that fetches remote media with yt-dlp, tracks each download as
//! an in-memory job, and copies local folders into an object storage bucket.
//!
//! ## Overview
//!
//! - `POST /download` starts a job and returns its id (or waits for it)
//! - `GET /status/{id}` and `GET /jobs` expose job records
//! - `POST /upload-folder` walks a folder and uploads every file
//! - `GET /events` streams job events as server-sent events
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_relay::{Config, MediaRelay};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.storage.bucket = Some("my-bucket".to_string());
//!
//!     let relay = Arc::new(MediaRelay::new(config).await?);
//!
//!     // Subscribe to events
//!     let mut events = relay.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let server = relay.spawn_api_server();
//!     media_relay::run_with_shutdown(&relay).await?;
//!     server.await??;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// yt-dlp invocation and download orchestration
pub mod fetcher;
/// In-memory job registry
pub mod registry;
/// Service facade
pub mod relay;
/// Object storage backends
pub mod storage;
/// Core types and events
pub mod types;
/// Folder upload
pub mod upload;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, StorageBackend};
pub use error::{ApiError, Error, Result, StorageError, ToHttpStatus};
pub use fetcher::{FetchTool, Fetcher};
pub use registry::JobRegistry;
pub use relay::MediaRelay;
pub use storage::{BlobStore, GcsBlobStore, LocalBlobStore, TokenSource};
pub use types::{
    DownloadAccepted, Event, Job, JobId, JobState, JobStatus, UploadStatus, UploadSummary,
};
pub use upload::FolderUploader;

/// Helper function to run the service with graceful signal handling.
///
/// Waits for a termination signal and then calls [`MediaRelay::shutdown`],
/// which also stops the API server.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(relay: &MediaRelay) -> Result<()> {
    wait_for_signal().await;
    relay.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
