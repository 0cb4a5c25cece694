pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /jobs                                  submit (POST)
/// /jobs/{job_id}/status                  current status record (GET)
/// /jobs/{job_id}/stream                  server-sent status events (GET)
/// /jobs/{job_id}/retry                   regenerate with new parameters (POST)
/// /jobs/{job_id}/history                 regeneration history (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/jobs", jobs::router())
}
