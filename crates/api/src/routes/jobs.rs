//! Route definitions for the `/jobs` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;
use crate::stream;

/// Routes mounted at `/jobs`.
///
/// ```text
/// POST   /                      -> submit_job
/// GET    /{job_id}/status       -> get_status
/// GET    /{job_id}/stream       -> stream_job
/// POST   /{job_id}/retry        -> retry_job
/// GET    /{job_id}/history      -> list_history
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(jobs::submit_job))
        .route("/{job_id}/status", get(jobs::get_status))
        .route("/{job_id}/stream", get(stream::stream_job))
        .route("/{job_id}/retry", post(jobs::retry_job))
        .route("/{job_id}/history", get(jobs::list_history))
}
