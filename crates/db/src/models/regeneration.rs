use docgen_core::types::Timestamp;
use sqlx::FromRow;

/// A row from the `regeneration_history` table.
#[derive(Debug, Clone, FromRow)]
pub struct RegenerationEntry {
    pub id: i64,
    pub job_id: String,
    pub requested_parameters: serde_json::Value,
    pub requested_at: Timestamp,
}
