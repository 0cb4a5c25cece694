//! Per-connection change detection for the push stream.
//!
//! [`SubscriberView`] decides, from successive status snapshots, which
//! frame (if any) a connection should emit next. It holds no timers and does
//! no I/O, so every ordering rule lives here:
//!
//! - a snapshot identical to the last one sent produces nothing;
//! - a missing or terminal snapshot produces exactly one terminal frame;
//! - after the terminal frame, nothing is ever produced again.

use axum::response::sse::Event;
use docgen_core::job_status::{JobStatus, JobStatusRecord};
use serde::Serialize;

/// Status reported for a job the store does not know.
pub const STATUS_NOT_FOUND: &str = "not_found";

/// One outbound stream event.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Acknowledges the connection.
    Open { job_id: String },
    /// Non-terminal snapshot.
    Progress(Box<JobStatusRecord>),
    /// `success` or `skipped` snapshot.
    Complete(Box<JobStatusRecord>),
    /// `failed` snapshot.
    Error(Box<JobStatusRecord>),
    /// No record exists (never submitted, or expired).
    NotFound { job_id: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OpenBody<'a> {
    job_id: &'a str,
    connected_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotFoundBody<'a> {
    job_id: &'a str,
    status: &'static str,
    message: &'static str,
}

impl Frame {
    /// SSE event name: `open`, `progress`, `complete` or `error`.
    pub fn name(&self) -> &'static str {
        match self {
            Frame::Open { .. } => "open",
            Frame::Progress(_) => "progress",
            Frame::Complete(_) | Frame::NotFound { .. } => "complete",
            Frame::Error(_) => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Frame::Complete(_) | Frame::Error(_) | Frame::NotFound { .. }
        )
    }

    pub fn into_event(self) -> Event {
        let name = self.name();
        let data = match &self {
            Frame::Open { job_id } => serde_json::to_string(&OpenBody {
                job_id,
                connected_at: chrono::Utc::now(),
            }),
            Frame::Progress(record) | Frame::Complete(record) | Frame::Error(record) => {
                serde_json::to_string(record)
            }
            Frame::NotFound { job_id } => serde_json::to_string(&NotFoundBody {
                job_id,
                status: STATUS_NOT_FOUND,
                message: "No status is available for this job",
            }),
        };

        let data = data.unwrap_or_else(|e| {
            tracing::warn!(event = name, error = %e, "Failed to serialize stream event");
            "{}".to_string()
        });
        Event::default().event(name).data(data)
    }
}

/// Change-detection state of one stream connection.
#[derive(Debug)]
pub struct SubscriberView {
    job_id: String,
    last_sent: Option<JobStatusRecord>,
    terminal_sent: bool,
}

impl SubscriberView {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            last_sent: None,
            terminal_sent: false,
        }
    }

    /// Frame to emit for `snapshot`, or `None` when nothing changed or the
    /// terminal frame was already produced.
    pub fn observe(&mut self, snapshot: Option<&JobStatusRecord>) -> Option<Frame> {
        if self.terminal_sent {
            return None;
        }

        let Some(record) = snapshot else {
            self.terminal_sent = true;
            return Some(Frame::NotFound {
                job_id: self.job_id.clone(),
            });
        };

        let comparable = without_expiry(record);
        if self.last_sent.as_ref() == Some(&comparable) {
            return None;
        }
        self.last_sent = Some(comparable);

        let record = Box::new(record.clone());
        let frame = match record.status {
            JobStatus::Pending | JobStatus::Processing => Frame::Progress(record),
            JobStatus::Success | JobStatus::Skipped => Frame::Complete(record),
            JobStatus::Failed => Frame::Error(record),
        };
        self.terminal_sent = frame.is_terminal();
        Some(frame)
    }

    /// Whether the terminal frame has been produced.
    pub fn is_finished(&self) -> bool {
        self.terminal_sent
    }
}

/// Every store write re-stamps `expires_at`; it must not count as a change.
fn without_expiry(record: &JobStatusRecord) -> JobStatusRecord {
    let mut record = record.clone();
    record.expires_at = record.start_time;
    record
}
