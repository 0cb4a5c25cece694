//! Handlers for the `/jobs` resource.
//!
//! Submission and retry validate synchronously and answer `202 Accepted`
//! as soon as the job's first status record is written; the render call
//! itself runs on a background task and is observed through `/status` and
//! `/stream`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use docgen_core::error::CoreError;
use docgen_core::job_status::{JobStatus, JobStatusRecord};
use docgen_core::params::RenderParameters;
use docgen_pipeline::stores::StoredSubmission;
use docgen_pipeline::InvokeOptions;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Longest caller-supplied job id.
const MAX_JOB_ID_LEN: usize = 128;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobRequest {
    /// Caller-chosen id; a UUID is generated when absent.
    #[serde(default)]
    pub job_id: Option<String>,
    pub payload: serde_json::Value,
    pub parameters: RenderParameters,
    /// Overrides the server's continue-on-failure policy for this job.
    #[serde(default)]
    pub continue_on_failure: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RetryJobRequest {
    pub parameters: RenderParameters,
}

/// Body of a `202 Accepted` answer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAccepted {
    pub job_id: String,
    pub status: JobStatus,
    pub attempt: u32,
}

impl From<&JobStatusRecord> for JobAccepted {
    fn from(record: &JobStatusRecord) -> Self {
        Self {
            job_id: record.job_id.clone(),
            status: record.status,
            attempt: record.attempt,
        }
    }
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Validate, record `pending`, persist the original submission, then hand
/// the job to the invoker. Returns 202 with the job id.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(input): Json<SubmitJobRequest>,
) -> AppResult<impl IntoResponse> {
    input.parameters.check()?;
    let job_id = resolve_job_id(input.job_id)?;

    let pending = state
        .status_store
        .begin_attempt(JobStatusRecord::pending(&job_id, 0))
        .await;

    let submission = StoredSubmission::new(&job_id, input.payload.clone(), &input.parameters);
    if let Err(e) = state.submissions.save(&submission).await {
        let err = CoreError::Internal(format!("failed to save submission {job_id}: {e}"));
        state
            .status_store
            .set(pending.into_failed(&err, false))
            .await;
        return Err(AppError::Core(err));
    }
    if let Err(e) = state.archive.put(&submission).await {
        tracing::warn!(job_id = %job_id, error = %e, "Could not archive submission payload");
    }

    let options = InvokeOptions {
        parameters: input.parameters,
        continue_on_failure: input.continue_on_failure,
    };
    let record = state
        .invoker
        .dispatch(&job_id, Some(pending.attempt), input.payload, options)
        .await?;

    tracing::info!(
        job_id = %job_id,
        status = record.status.as_str(),
        "Job submitted",
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: JobAccepted::from(&record),
        }),
    ))
}

/// Use the caller's id when it is sane, otherwise mint one.
fn resolve_job_id(requested: Option<String>) -> Result<String, CoreError> {
    let Some(job_id) = requested else {
        return Ok(uuid::Uuid::new_v4().to_string());
    };

    let job_id = job_id.trim();
    if job_id.is_empty() || job_id.len() > MAX_JOB_ID_LEN {
        return Err(CoreError::Validation(format!(
            "jobId must be between 1 and {MAX_JOB_ID_LEN} characters"
        )));
    }
    if job_id.chars().any(char::is_control) || job_id.contains('/') {
        return Err(CoreError::Validation(
            "jobId must not contain '/' or control characters".into(),
        ));
    }
    Ok(job_id.to_string())
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/{job_id}/status
///
/// 404 both for ids that were never submitted and for expired records.
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let record = state
        .status_store
        .get(&job_id)
        .await
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Job",
                id: job_id.clone(),
            })
        })?;

    Ok(Json(DataResponse { data: record }))
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs/{job_id}/retry
///
/// Rerun a job from its stored submission under the same id. Open streams
/// on the id observe the new attempt. Returns 202, or 404 when no stored
/// submission exists.
pub async fn retry_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(input): Json<RetryJobRequest>,
) -> AppResult<impl IntoResponse> {
    let record = state
        .retry
        .retry_in_background(&job_id, input.parameters)
        .await?;

    tracing::info!(job_id = %job_id, attempt = record.attempt, "Job regeneration started");

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: JobAccepted::from(&record),
        }),
    ))
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/{job_id}/history
///
/// Regeneration requests for the job, newest first. Empty for jobs that
/// were never regenerated.
pub async fn list_history(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let history = state
        .submissions
        .regeneration_history(&job_id)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(Json(DataResponse { data: history }))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn missing_job_id_is_generated() {
        let id = resolve_job_id(None).unwrap();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn job_id_is_trimmed() {
        assert_eq!(resolve_job_id(Some(" case-42 ".into())).unwrap(), "case-42");
    }

    #[test]
    fn bad_job_ids_are_rejected() {
        assert_matches!(resolve_job_id(Some("   ".into())), Err(CoreError::Validation(_)));
        assert_matches!(
            resolve_job_id(Some("a/b".into())),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            resolve_job_id(Some("x".repeat(MAX_JOB_ID_LEN + 1))),
            Err(CoreError::Validation(_))
        );
    }
}
