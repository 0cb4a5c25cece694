use async_trait::async_trait;
use docgen_core::error::CoreError;
use docgen_core::job_status::DocumentProgress;
use docgen_core::params::RenderParameters;
use docgen_core::types::JobId;
use serde::Serialize;

/// Body of a render call: the original submission plus the parameter
/// subset to produce.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub job_id: JobId,
    pub payload: serde_json::Value,
    pub parameters: RenderParameters,
}

/// Outcome classes of a failed render or progress call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    /// The service could not be reached or did not answer in time.
    #[error("Render service unreachable: {message}")]
    Unreachable { message: String, timed_out: bool },

    /// The service answered and reported a failure.
    #[error("Render service rejected the job: {0}")]
    Rejected(String),
}

impl RenderError {
    /// Only connection-level failures are worth another attempt; a timed-out
    /// render may still be running upstream.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RenderError::Unreachable {
                timed_out: false,
                ..
            }
        )
    }

    pub fn timed_out(message: impl Into<String>) -> Self {
        RenderError::Unreachable {
            message: message.into(),
            timed_out: true,
        }
    }
}

impl From<RenderError> for CoreError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Unreachable { message, .. } => CoreError::UpstreamUnreachable(message),
            RenderError::Rejected(message) => CoreError::UpstreamRejected(message),
        }
    }
}

/// The external render/normalize service as seen by the pipeline.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Run the full render for one job. Returns the service's result summary.
    ///
    /// This is the slow call (minutes); callers impose their own timeout.
    async fn render(&self, request: &RenderRequest) -> Result<serde_json::Value, RenderError>;

    /// Query the companion progress endpoint for a running job.
    async fn progress(&self, job_id: &str) -> Result<DocumentProgress, RenderError>;
}
