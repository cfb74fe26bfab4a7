//! REST API server module
//!
//! Exposes downloads, job status and folder uploads over JSON, plus health,
//! OpenAPI and a server-sent event stream.

use crate::{MediaRelay, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Jobs
/// - `POST /download` - Start a download job
/// - `GET /status/:job_id` - Get one job
/// - `GET /jobs` - List all jobs
///
/// ## Storage
/// - `POST /upload-folder` - Upload a local folder into the bucket
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent events stream
pub fn create_router(relay: Arc<MediaRelay>) -> Router {
    let config = relay.get_config();
    let state = AppState::new(relay);

    let router = Router::new()
        // Jobs
        .route("/download", post(routes::create_download))
        .route("/status/:job_id", get(routes::get_job_status))
        .route("/jobs", get(routes::list_jobs))
        // Storage
        .route("/upload-folder", post(routes::upload_folder))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream));

    // Swagger UI reuses the /openapi.json endpoint above
    let router = if config.server.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    if config.server.cors_enabled {
        let cors = build_cors_layer(&config.server.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until [`MediaRelay::shutdown`] is called, then stops accepting
/// connections and waits for in-flight requests to finish.
///
/// # Example
///
/// ```no_run
/// use media_relay::{Config, MediaRelay};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let relay = Arc::new(MediaRelay::new(Config::default()).await?);
///
/// // Start API server (blocks until shutdown)
/// media_relay::api::start_api_server(relay).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(relay: Arc<MediaRelay>) -> Result<()> {
    let bind_address = relay.config.server.bind_address;
    let shutdown_token = relay.shutdown_token.clone();

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(relay);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
