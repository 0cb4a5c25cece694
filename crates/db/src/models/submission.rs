//! Submission rows: the original payload of a job and the parameters it
//! was last requested with.

use docgen_core::types::Timestamp;
use sqlx::FromRow;

/// A row from the `submissions` table.
#[derive(Debug, Clone, FromRow)]
pub struct Submission {
    pub id: i64,
    pub job_id: String,
    pub payload: serde_json::Value,
    pub requested_parameters: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
