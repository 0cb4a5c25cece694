//! The per-job status record and its forward-only state machine.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::phases::{
    PHASE_COMPLETE, PHASE_FAILED, PHASE_PIPELINE_STARTED, PHASE_RENDERING, PHASE_SAVING_FORM,
    PHASE_SKIPPED,
};
use crate::progress::{
    derive_progress, PROGRESS_COMPLETE, PROGRESS_PIPELINE_STARTED, PROGRESS_SAVING_FORM,
};
use crate::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Coarse lifecycle state of a job.
///
/// Transitions only move forward: `pending -> processing -> terminal`, and
/// every terminal state is also reachable straight from `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Success,
    Failed,
    Skipped,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
            JobStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Failed | JobStatus::Skipped
        )
    }

    /// Whether a record in `self` may be overwritten by one in `next`
    /// within the same attempt.
    ///
    /// Non-terminal states may be rewritten in place (progress updates);
    /// terminal states are final.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        match self {
            JobStatus::Pending => true,
            JobStatus::Processing => next != JobStatus::Pending,
            JobStatus::Success | JobStatus::Failed | JobStatus::Skipped => false,
        }
    }
}

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Stable, client-facing classification of why a job did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Disabled,
    UpstreamUnreachable,
    UpstreamRejected,
    NotFound,
    InvalidParameters,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Disabled => "disabled",
            ErrorKind::UpstreamUnreachable => "upstream_unreachable",
            ErrorKind::UpstreamRejected => "upstream_rejected",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidParameters => "invalid_parameters",
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentProgress
// ---------------------------------------------------------------------------

/// Fine-grained rendering progress as reported by the render service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentProgress {
    pub completed: u32,
    pub total: u32,
    pub current_item_label: Option<String>,
}

// ---------------------------------------------------------------------------
// JobStatusRecord
// ---------------------------------------------------------------------------

/// Everything a polling or streaming client learns about one job.
///
/// `expires_at` is owned by the status store, which re-stamps it on every
/// write; constructors only fill in a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusRecord {
    pub job_id: JobId,
    pub status: JobStatus,
    pub phase: String,
    pub progress: u8,
    pub current_phase_message: String,
    pub document_progress: Option<DocumentProgress>,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub execution_time_ms: Option<i64>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub result: Option<serde_json::Value>,
    /// The job failed but the caller was allowed to carry on.
    pub continued: bool,
    /// 1 for a fresh submission, incremented by every retry.
    pub attempt: u32,
    pub expires_at: Timestamp,
}

impl JobStatusRecord {
    fn base(job_id: &str, attempt: u32, status: JobStatus, phase: &str, message: &str) -> Self {
        let now = chrono::Utc::now();
        Self {
            job_id: job_id.to_string(),
            status,
            phase: phase.to_string(),
            progress: 0,
            current_phase_message: message.to_string(),
            document_progress: None,
            start_time: now,
            end_time: None,
            execution_time_ms: None,
            error: None,
            error_kind: None,
            result: None,
            continued: false,
            attempt,
            expires_at: now,
        }
    }

    /// Record written while the submission is being saved.
    pub fn pending(job_id: &str, attempt: u32) -> Self {
        Self {
            progress: PROGRESS_SAVING_FORM,
            ..Self::base(
                job_id,
                attempt,
                JobStatus::Pending,
                PHASE_SAVING_FORM,
                "Saving your form",
            )
        }
    }

    /// Record written when the invoker takes ownership of the job.
    pub fn processing(job_id: &str, attempt: u32) -> Self {
        Self {
            progress: PROGRESS_PIPELINE_STARTED,
            document_progress: Some(DocumentProgress::default()),
            ..Self::base(
                job_id,
                attempt,
                JobStatus::Processing,
                PHASE_PIPELINE_STARTED,
                "Generating your documents",
            )
        }
    }

    /// Terminal record for a job that never ran because generation is disabled.
    pub fn skipped(job_id: &str, attempt: u32) -> Self {
        let mut record = Self {
            progress: PROGRESS_COMPLETE,
            error_kind: Some(ErrorKind::Disabled),
            ..Self::base(
                job_id,
                attempt,
                JobStatus::Skipped,
                PHASE_SKIPPED,
                "Document generation is currently disabled",
            )
        };
        record.finish();
        record
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Transition to `success`, fixing progress at 100.
    pub fn into_success(mut self, result: serde_json::Value) -> Self {
        self.status = JobStatus::Success;
        self.phase = PHASE_COMPLETE.to_string();
        self.progress = PROGRESS_COMPLETE;
        self.current_phase_message = "Your documents are ready".to_string();
        self.result = Some(result);
        self.finish();
        self
    }

    /// Transition to `failed`, keeping the last known progress.
    pub fn into_failed(mut self, error: &CoreError, continued: bool) -> Self {
        self.status = JobStatus::Failed;
        self.phase = PHASE_FAILED.to_string();
        self.current_phase_message = "Document generation failed".to_string();
        self.error = Some(error.display_message());
        self.error_kind = error.kind();
        self.continued = continued;
        self.finish();
        self
    }

    /// Fold a sub-progress report into this record.
    ///
    /// Progress never decreases, and never reaches 100 from sub-progress
    /// alone. A report with `total == 0` carries no information and is
    /// ignored.
    pub fn apply_document_progress(&mut self, report: DocumentProgress) {
        if report.total == 0 || self.is_terminal() {
            return;
        }

        let derived = derive_progress(PROGRESS_PIPELINE_STARTED, report.completed, report.total);
        self.progress = self.progress.max(derived);
        self.phase = PHASE_RENDERING.to_string();
        self.current_phase_message = match &report.current_item_label {
            Some(label) => format!(
                "Rendering document {} of {}: {label}",
                (report.completed + 1).min(report.total),
                report.total
            ),
            None => format!(
                "Rendered {} of {} documents",
                report.completed.min(report.total),
                report.total
            ),
        };
        self.document_progress = Some(report);
    }

    fn finish(&mut self) {
        let end = chrono::Utc::now();
        self.execution_time_ms = Some((end - self.start_time).num_milliseconds().max(0));
        self.end_time = Some(end);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
