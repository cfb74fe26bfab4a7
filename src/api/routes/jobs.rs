//! Download job handlers.

use super::DownloadRequest;
use crate::api::AppState;
use crate::error::Error;
use crate::types::{DownloadAccepted, Job, JobId};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};

/// POST /download - Start a download job
#[utoipa::path(
    post,
    path = "/download",
    tag = "jobs",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Job accepted (filename only when waiting for completion)", body = DownloadAccepted),
        (status = 400, description = "URL missing or empty", body = crate::error::ApiError),
        (status = 503, description = "Service is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn create_download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Json<DownloadAccepted>, Error> {
    let url = match payload {
        Ok(Json(request)) => request.url,
        Err(rejection) => {
            tracing::debug!(reason = %rejection, "Rejected download request body");
            None
        }
    };

    let accepted = state.relay.download(url.as_deref()).await?;
    Ok(Json(accepted))
}

/// GET /status/:job_id - Get one job
#[utoipa::path(
    get,
    path = "/status/{job_id}",
    tag = "jobs",
    params(
        ("job_id" = String, Path, description = "Job ID returned by POST /download")
    ),
    responses(
        (status = 200, description = "Job record", body = Job),
        (status = 404, description = "Job not found", body = crate::error::ApiError)
    )
)]
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, Error> {
    let job = state.relay.job_status(&JobId::from(job_id)).await?;
    Ok(Json(job))
}

/// GET /jobs - List all jobs
#[utoipa::path(
    get,
    path = "/jobs",
    tag = "jobs",
    responses(
        (status = 200, description = "Every tracked job, oldest first", body = Vec<Job>)
    )
)]
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<Job>> {
    Json(state.relay.list_jobs().await)
}
