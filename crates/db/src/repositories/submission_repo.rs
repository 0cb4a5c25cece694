//! Repository for the `submissions` table.

use sqlx::PgPool;

use crate::models::submission::Submission;

/// Column list for `submissions` queries.
const COLUMNS: &str = "id, job_id, payload, requested_parameters, created_at, updated_at";

/// Lookup and upsert of original job payloads.
pub struct SubmissionRepo;

impl SubmissionRepo {
    /// Insert a submission, or overwrite the payload of an existing job id.
    pub async fn upsert(
        pool: &PgPool,
        job_id: &str,
        payload: &serde_json::Value,
        requested_parameters: &serde_json::Value,
    ) -> Result<Submission, sqlx::Error> {
        let query = format!(
            "INSERT INTO submissions (job_id, payload, requested_parameters) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (job_id) DO UPDATE \
             SET payload = EXCLUDED.payload, \
                 requested_parameters = EXCLUDED.requested_parameters, \
                 updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Submission>(&query)
            .bind(job_id)
            .bind(payload)
            .bind(requested_parameters)
            .fetch_one(pool)
            .await
    }

    /// Find a submission by job id.
    pub async fn find_by_job_id(
        pool: &PgPool,
        job_id: &str,
    ) -> Result<Option<Submission>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM submissions WHERE job_id = $1");
        sqlx::query_as::<_, Submission>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// Replace the parameters a job is requested with.
    ///
    /// Returns `false` when no row exists for `job_id`.
    pub async fn update_requested_parameters(
        pool: &PgPool,
        job_id: &str,
        requested_parameters: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE submissions \
             SET requested_parameters = $2, updated_at = NOW() \
             WHERE job_id = $1",
        )
        .bind(job_id)
        .bind(requested_parameters)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
