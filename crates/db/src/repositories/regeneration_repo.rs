//! Repository for the `regeneration_history` table.

use sqlx::PgPool;

use crate::models::regeneration::RegenerationEntry;

/// Append-only audit log of regeneration requests.
pub struct RegenerationRepo;

impl RegenerationRepo {
    /// Record that `job_id` was regenerated with `requested_parameters`.
    pub async fn record(
        pool: &PgPool,
        job_id: &str,
        requested_parameters: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO regeneration_history (job_id, requested_parameters) VALUES ($1, $2)",
        )
        .bind(job_id)
        .bind(requested_parameters)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// List the regeneration history of a job, newest first.
    pub async fn list_for_job(
        pool: &PgPool,
        job_id: &str,
    ) -> Result<Vec<RegenerationEntry>, sqlx::Error> {
        sqlx::query_as::<_, RegenerationEntry>(
            "SELECT id, job_id, requested_parameters, requested_at \
             FROM regeneration_history WHERE job_id = $1 ORDER BY requested_at DESC",
        )
        .bind(job_id)
        .fetch_all(pool)
        .await
    }
}
