//! Regeneration of a previously submitted job under the same job id.
//!
//! The original submission is located in the primary store first and in
//! the payload archive second. Bookkeeping on the primary store (new
//! requested parameters, regeneration history) is best-effort. The rerun
//! starts a new attempt, so its records supersede the previous terminal one
//! and any open stream simply sees the job go back to `processing`.

use std::sync::Arc;

use docgen_core::error::CoreError;
use docgen_core::job_status::JobStatusRecord;
use docgen_core::params::RenderParameters;

use crate::invoker::{InvocationResult, InvokeOptions, PipelineInvoker};
use crate::stores::{archive_file_name, PayloadArchive, StoredSubmission, SubmissionStore};

pub struct RetryOrchestrator {
    invoker: Arc<PipelineInvoker>,
    submissions: Arc<dyn SubmissionStore>,
    archive: Arc<dyn PayloadArchive>,
}

/// Where the original submission was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Primary,
    Archive,
}

impl RetryOrchestrator {
    pub fn new(
        invoker: Arc<PipelineInvoker>,
        submissions: Arc<dyn SubmissionStore>,
        archive: Arc<dyn PayloadArchive>,
    ) -> Self {
        Self {
            invoker,
            submissions,
            archive,
        }
    }

    /// Rerun `job_id` with `parameters` and wait for its terminal state.
    ///
    /// Fails with [`CoreError::Validation`] or [`CoreError::NotFound`] before
    /// the status store is touched.
    pub async fn retry(
        &self,
        job_id: &str,
        parameters: RenderParameters,
    ) -> Result<InvocationResult, CoreError> {
        let (submission, parameters) = self.prepare(job_id, parameters).await?;
        self.invoker
            .invoke(job_id, submission.payload, InvokeOptions::new(parameters))
            .await
    }

    /// Like [`retry`](Self::retry), but returns as soon as the new attempt's
    /// first record is written.
    pub async fn retry_in_background(
        &self,
        job_id: &str,
        parameters: RenderParameters,
    ) -> Result<JobStatusRecord, CoreError> {
        let (submission, parameters) = self.prepare(job_id, parameters).await?;
        self.invoker
            .dispatch(job_id, None, submission.payload, InvokeOptions::new(parameters))
            .await
    }

    async fn prepare(
        &self,
        job_id: &str,
        requested: RenderParameters,
    ) -> Result<(StoredSubmission, RenderParameters), CoreError> {
        requested.check()?;

        let (submission, source) =
            self.locate(job_id).await.ok_or_else(|| CoreError::NotFound {
                entity: "Submission",
                id: job_id.to_string(),
            })?;

        let parameters = merge_parameters(submission.parameters(), requested);

        if source == Source::Primary {
            if let Err(e) = self.submissions.update_parameters(job_id, &parameters).await {
                tracing::warn!(
                    job_id,
                    error = %e,
                    "Could not persist regeneration parameters, continuing",
                );
            }
        }
        if let Err(e) = self.submissions.record_regeneration(job_id, &parameters).await {
            tracing::debug!(job_id, error = %e, "Could not record regeneration history");
        }

        tracing::info!(
            job_id,
            source = ?source,
            outputs = parameters.outputs.len(),
            "Regenerating job",
        );
        Ok((submission, parameters))
    }

    /// First store that has the submission wins. Lookup errors count as a
    /// miss so a broken primary store still lets the archive answer.
    async fn locate(&self, job_id: &str) -> Option<(StoredSubmission, Source)> {
        match self.submissions.find(job_id).await {
            Ok(Some(submission)) => return Some((submission, Source::Primary)),
            Ok(None) => {}
            Err(e) => tracing::warn!(job_id, error = %e, "Primary submission lookup failed"),
        }

        match self.archive.get(job_id).await {
            Ok(found) => found.map(|submission| (submission, Source::Archive)),
            Err(e) => {
                tracing::warn!(
                    job_id,
                    file = %archive_file_name(job_id),
                    error = %e,
                    "Archived submission lookup failed",
                );
                None
            }
        }
    }
}

/// The requested outputs replace the stored ones; a notification address
/// carries over unless a new one is given.
fn merge_parameters(
    stored: Option<RenderParameters>,
    requested: RenderParameters,
) -> RenderParameters {
    RenderParameters {
        notify_email: requested
            .notify_email
            .or_else(|| stored.and_then(|stored| stored.notify_email)),
        ..requested
    }
}
