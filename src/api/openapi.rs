//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the media-relay REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-relay REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-relay REST API",
        version = "0.1.0",
        description = "Start yt-dlp downloads, poll their progress, and upload server folders to object storage",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Jobs
        crate::api::routes::create_download,
        crate::api::routes::get_job_status,
        crate::api::routes::list_jobs,

        // Storage
        crate::api::routes::upload_folder,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobId,
        crate::types::JobStatus,
        crate::types::JobState,
        crate::types::Job,
        crate::types::DownloadAccepted,
        crate::types::UploadStatus,
        crate::types::UploadSummary,
        crate::types::Event,

        // API request types
        crate::api::routes::DownloadRequest,
        crate::api::routes::UploadFolderRequest,

        // Error types from error.rs
        crate::error::ApiError,
    )),
    tags(
        (name = "jobs", description = "Download jobs - Start yt-dlp downloads and poll their status"),
        (name = "storage", description = "Object storage - Upload server-side folders into the bucket"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
