//! Folder upload handler.

use super::UploadFolderRequest;
use crate::api::AppState;
use crate::error::Error;
use crate::types::UploadSummary;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use std::path::PathBuf;

/// POST /upload-folder - Upload a local folder into the bucket
#[utoipa::path(
    post,
    path = "/upload-folder",
    tag = "storage",
    request_body = UploadFolderRequest,
    responses(
        (status = 200, description = "Upload finished (possibly with per-file errors)", body = UploadSummary),
        (status = 400, description = "Missing payload or field, or no bucket configured", body = crate::error::ApiError),
        (status = 404, description = "Source folder not found", body = crate::error::ApiError),
        (status = 500, description = "Unexpected error", body = crate::error::ApiError)
    )
)]
pub async fn upload_folder(
    State(state): State<AppState>,
    payload: Result<Json<UploadFolderRequest>, JsonRejection>,
) -> Result<Json<UploadSummary>, Error> {
    // Configuration problems are reported before payload problems
    let uploader = state.relay.folder_uploader().inspect_err(|e| {
        tracing::error!(error = %e, "Upload folder request failed: storage not configured");
    })?;

    let Ok(Json(request)) = payload else {
        tracing::warn!("Upload folder request rejected: missing JSON payload");
        return Err(Error::InvalidRequest("Missing JSON payload".into()));
    };

    let source_folder = request
        .source_folder
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            tracing::warn!("Upload folder request rejected: missing 'source_folder'");
            Error::InvalidRequest("Missing required field: 'source_folder'".into())
        })?;

    // An empty prefix is valid; only an absent one is rejected
    let destination_prefix = request.destination_prefix.ok_or_else(|| {
        tracing::warn!("Upload folder request rejected: missing 'destination_prefix'");
        Error::InvalidRequest("Missing required field: 'destination_prefix'".into())
    })?;

    let summary = uploader
        .upload_folder(&PathBuf::from(source_folder), &destination_prefix)
        .await?;
    Ok(Json(summary))
}
