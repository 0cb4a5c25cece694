//! Where original submissions are kept so a job can be regenerated.
//!
//! Two seams, tried in order by the retry path:
//!
//! - [`SubmissionStore`]: the primary structured store, keyed by job id.
//!   Also carries the requested parameters and the regeneration history.
//! - [`PayloadArchive`]: a document store keyed by a file name derived
//!   from the job id ([`archive_file_name`]).

use async_trait::async_trait;
use docgen_core::params::RenderParameters;
use docgen_core::types::Timestamp;
use serde::{Deserialize, Serialize};

mod local;
mod memory;
mod postgres;

pub use local::LocalPayloadArchive;
pub use memory::{InMemoryPayloadArchive, InMemorySubmissionStore};
pub use postgres::PgSubmissionStore;

/// An original job submission as it was accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSubmission {
    pub job_id: String,
    pub payload: serde_json::Value,
    /// Parameters the job was last requested with, as stored.
    #[serde(default)]
    pub requested_parameters: serde_json::Value,
}

impl StoredSubmission {
    pub fn new(job_id: &str, payload: serde_json::Value, parameters: &RenderParameters) -> Self {
        Self {
            job_id: job_id.to_string(),
            payload,
            requested_parameters: serde_json::to_value(parameters)
                .unwrap_or(serde_json::Value::Null),
        }
    }

    /// The stored parameters, if they still parse.
    pub fn parameters(&self) -> Option<RenderParameters> {
        serde_json::from_value(self.requested_parameters.clone()).ok()
    }
}

/// One regeneration request, kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerationRecord {
    pub job_id: String,
    pub requested_parameters: serde_json::Value,
    pub requested_at: Timestamp,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed stored document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Primary store of original submissions.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Insert or overwrite the submission for `job_id`.
    async fn save(&self, submission: &StoredSubmission) -> Result<(), StoreError>;

    async fn find(&self, job_id: &str) -> Result<Option<StoredSubmission>, StoreError>;

    /// Replace the requested parameters. `Ok(false)` when there is no row.
    async fn update_parameters(
        &self,
        job_id: &str,
        parameters: &RenderParameters,
    ) -> Result<bool, StoreError>;

    async fn record_regeneration(
        &self,
        job_id: &str,
        parameters: &RenderParameters,
    ) -> Result<(), StoreError>;

    /// Regeneration requests for `job_id`, newest first.
    async fn regeneration_history(
        &self,
        job_id: &str,
    ) -> Result<Vec<RegenerationRecord>, StoreError>;
}

/// Fallback document store of original submissions.
#[async_trait]
pub trait PayloadArchive: Send + Sync {
    async fn put(&self, submission: &StoredSubmission) -> Result<(), StoreError>;

    async fn get(&self, job_id: &str) -> Result<Option<StoredSubmission>, StoreError>;
}

/// File name under which a job's submission is archived.
///
/// Anything outside `[A-Za-z0-9_-]` becomes `_`, so a job id can never
/// escape the archive directory.
pub fn archive_file_name(job_id: &str) -> String {
    let stem: String = job_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{stem}.json")
}
