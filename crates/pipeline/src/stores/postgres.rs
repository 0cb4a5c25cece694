use async_trait::async_trait;
use docgen_core::params::RenderParameters;
use docgen_db::repositories::{RegenerationRepo, SubmissionRepo};
use docgen_db::DbPool;

use super::{RegenerationRecord, StoreError, StoredSubmission, SubmissionStore};

/// [`SubmissionStore`] backed by the `submissions` and
/// `regeneration_history` tables.
#[derive(Clone)]
pub struct PgSubmissionStore {
    pool: DbPool,
}

impl PgSubmissionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn save(&self, submission: &StoredSubmission) -> Result<(), StoreError> {
        SubmissionRepo::upsert(
            &self.pool,
            &submission.job_id,
            &submission.payload,
            &submission.requested_parameters,
        )
        .await?;
        Ok(())
    }

    async fn find(&self, job_id: &str) -> Result<Option<StoredSubmission>, StoreError> {
        let row = SubmissionRepo::find_by_job_id(&self.pool, job_id).await?;
        Ok(row.map(|row| StoredSubmission {
            job_id: row.job_id,
            payload: row.payload,
            requested_parameters: row.requested_parameters,
        }))
    }

    async fn update_parameters(
        &self,
        job_id: &str,
        parameters: &RenderParameters,
    ) -> Result<bool, StoreError> {
        let value = serde_json::to_value(parameters)?;
        Ok(SubmissionRepo::update_requested_parameters(&self.pool, job_id, &value).await?)
    }

    async fn record_regeneration(
        &self,
        job_id: &str,
        parameters: &RenderParameters,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(parameters)?;
        RegenerationRepo::record(&self.pool, job_id, &value).await?;
        Ok(())
    }

    async fn regeneration_history(
        &self,
        job_id: &str,
    ) -> Result<Vec<RegenerationRecord>, StoreError> {
        let rows = RegenerationRepo::list_for_job(&self.pool, job_id).await?;
        Ok(rows
            .into_iter()
            .map(|row| RegenerationRecord {
                job_id: row.job_id,
                requested_parameters: row.requested_parameters,
                requested_at: row.requested_at,
            })
            .collect())
    }
}
