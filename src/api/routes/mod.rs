//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] - Download jobs and their status
//! - [`upload`] - Folder uploads into object storage
//! - [`system`] - Health, events, OpenAPI

use serde::{Deserialize, Serialize};

mod jobs;
mod system;
mod upload;

// Re-export all handlers so `routes::function_name` works
pub use jobs::*;
pub use system::*;
pub use upload::*;

// ============================================================================
// Request Types (shared across handlers)
// ============================================================================

/// Request body for POST /download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadRequest {
    /// Media page URL handed to yt-dlp
    pub url: Option<String>,
}

/// Request body for POST /upload-folder
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UploadFolderRequest {
    /// Folder on the server filesystem to upload
    pub source_folder: Option<String>,
    /// Blob name prefix inside the bucket (may be empty)
    pub destination_prefix: Option<String>,
}
