use chrono::{DateTime, Utc};
use docgen_core::types::JobId;
use serde::{Deserialize, Serialize};

/// Event name carried by every success notification.
pub const EVENT_JOB_COMPLETED: &str = "job.completed";

/// Notification emitted once a job's documents are ready.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobNotification {
    pub job_id: JobId,
    /// Result summary returned by the render service.
    pub result: serde_json::Value,
    /// Email address to notify, if the submitter asked for one.
    pub destination: Option<String>,
    /// Link where the submitter can follow up on the job.
    pub link: String,
    pub completed_at: DateTime<Utc>,
}

impl JobNotification {
    pub fn new(job_id: impl Into<JobId>, result: serde_json::Value, link: String) -> Self {
        Self {
            job_id: job_id.into(),
            result,
            destination: None,
            link,
            completed_at: Utc::now(),
        }
    }

    pub fn with_destination(mut self, destination: Option<String>) -> Self {
        self.destination = destination;
        self
    }
}
