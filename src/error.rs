//! Error types for media-relay
//!
//! This module provides the error handling for the library, including:
//! - The crate-wide [`Error`] type and [`Result`] alias
//! - Object-storage errors ([`StorageError`]) used to classify per-file upload failures
//! - HTTP status code mapping for API integration
//! - The JSON error body returned by the REST API

use crate::types::JobId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for media-relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-relay
///
/// Validation and configuration errors are raised synchronously before any
/// side effect. Once a job exists, failures are recorded on the job record
/// instead of being returned through this type.
#[derive(Debug, Error)]
pub enum Error {
    /// A required request field is missing or empty
    #[error("{0}")]
    InvalidRequest(String),

    /// Required configuration is absent or invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "storage.bucket")
        key: Option<String>,
    },

    /// No job with this id was ever created (or it has been evicted)
    #[error("Job not found")]
    JobNotFound(JobId),

    /// Source folder of an upload does not exist or is not a directory
    #[error("Source folder '{}' not found or is not a directory.", .0.display())]
    SourceFolderNotFound(PathBuf),

    /// External tool execution failed (yt-dlp missing, could not be spawned, ...)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// The service is shutting down and accepts no new work
    #[error("shutting down - not accepting new downloads")]
    ShuttingDown,

    /// Object storage error
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Object storage errors
///
/// The variants separate permission problems from transfer problems so folder
/// uploads can report them in different counters.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The local file could not be read
    #[error("permission denied for {path}: {reason}")]
    PermissionDenied {
        /// Local path or blob name the permission error relates to
        path: String,
        /// Underlying reason
        reason: String,
    },

    /// Credentials could not be obtained
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The upload request failed or was rejected by the bucket (401/403 included)
    #[error("transfer of {blob} failed: {reason}")]
    Transfer {
        /// Target blob name
        blob: String,
        /// Underlying reason
        reason: String,
    },

    /// Local I/O failure other than a permission problem
    #[error("I/O error: {0}")]
    Io(std::io::Error),
}

impl StorageError {
    /// Whether this failure is a permission problem
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StorageError::PermissionDenied { .. })
    }

    /// Classify a local I/O error for `path`
    pub fn from_io(path: &std::path::Path, error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::PermissionDenied {
            StorageError::PermissionDenied {
                path: path.display().to_string(),
                reason: error.to_string(),
            }
        } else {
            StorageError::Io(error)
        }
    }
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": "Job not found",
///   "code": "job_not_found"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Human-readable error message
    pub error: String,

    /// Machine-readable error code (e.g., "job_not_found", "invalid_request")
    pub code: String,

    /// Optional hint shown alongside the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            message: None,
        }
    }

    /// Attach a hint message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Create an "invalid request" error
    pub fn invalid_request(error: impl Into<String>) -> Self {
        Self::new("invalid_request", error)
    }

    /// Create an "internal server error"
    pub fn internal(error: impl Into<String>) -> Self {
        Self::new("internal_error", error)
    }
}

/// Convert errors to HTTP status codes for API responses
///
/// This trait maps domain errors to appropriate HTTP status codes.
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error or missing server configuration
            Error::InvalidRequest(_) => 400,
            Error::Config { .. } => 400,

            // 404 Not Found
            Error::JobNotFound(_) => 404,
            Error::SourceFolderNotFound(_) => 404,

            // 503 Service Unavailable
            Error::ExternalTool(_) => 503,
            Error::ShuttingDown => 503,

            // 500 Internal Server Error - everything unexpected
            Error::Storage(_) => 500,
            Error::Io(_) => 500,
            Error::Network(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::InvalidRequest(_) => "invalid_request",
            Error::Config { .. } => "config_error",
            Error::JobNotFound(_) => "job_not_found",
            Error::SourceFolderNotFound(_) => "source_folder_not_found",
            Error::ExternalTool(_) => "external_tool_error",
            Error::ShuttingDown => "shutting_down",
            Error::Storage(_) => "storage_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();

        match &error {
            Error::InvalidRequest(_) | Error::JobNotFound(_) => {
                ApiError::new(code, error.to_string())
            }
            Error::Config { message, .. } => ApiError::new(code, message.clone()),
            Error::SourceFolderNotFound(_) => ApiError::new(code, error.to_string()).with_message(
                "The specified source folder was not found on the server filesystem.",
            ),
            Error::ExternalTool(_) | Error::ShuttingDown => ApiError::new(code, error.to_string()),
            // Details of unexpected failures stay in the server log
            _ => {
                tracing::error!(error = %error, "Unexpected error while handling request");
                ApiError::new(code, "An unexpected server error occurred.")
            }
        }
    }
}
