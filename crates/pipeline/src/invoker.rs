//! Owns one job's render call from the initial `processing` write to its
//! terminal status.
//!
//! The invoker is the only writer of terminal records. While the render call
//! is in flight a [`ProgressPoller`] folds sub-progress into the same record;
//! the poller is held as a guard, so it stops on every exit path (including
//! panics and the surrounding task being aborted).

use std::sync::Arc;
use std::time::Instant;

use docgen_core::error::CoreError;
use docgen_core::job_status::{ErrorKind, JobStatus, JobStatusRecord};
use docgen_core::params::RenderParameters;
use docgen_events::{JobNotification, SuccessHook};
use docgen_render::{RenderBackend, RenderError, RenderRequest};
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::poller::ProgressPoller;
use crate::store::StatusStore;

/// Per-call options of [`PipelineInvoker::invoke`].
#[derive(Debug, Clone)]
pub struct InvokeOptions {
    pub parameters: RenderParameters,
    /// Overrides [`PipelineConfig::continue_on_failure`] for this call.
    pub continue_on_failure: Option<bool>,
}

impl InvokeOptions {
    pub fn new(parameters: RenderParameters) -> Self {
        Self {
            parameters,
            continue_on_failure: None,
        }
    }

    pub fn continue_on_failure(mut self, value: bool) -> Self {
        self.continue_on_failure = Some(value);
        self
    }
}

/// Outcome of an invocation as seen by its caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    pub job_id: String,
    pub status: JobStatus,
    pub attempt: u32,
    /// The job failed and the failure was absorbed.
    pub continued: bool,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub execution_time_ms: Option<i64>,
    pub result: Option<serde_json::Value>,
}

impl From<&JobStatusRecord> for InvocationResult {
    fn from(record: &JobStatusRecord) -> Self {
        Self {
            job_id: record.job_id.clone(),
            status: record.status,
            attempt: record.attempt,
            continued: record.continued,
            error: record.error.clone(),
            error_kind: record.error_kind,
            execution_time_ms: record.execution_time_ms,
            result: record.result.clone(),
        }
    }
}

pub struct PipelineInvoker {
    store: Arc<StatusStore>,
    backend: Arc<dyn RenderBackend>,
    hook: Option<Arc<dyn SuccessHook>>,
    config: PipelineConfig,
}

impl PipelineInvoker {
    pub fn new(
        store: Arc<StatusStore>,
        backend: Arc<dyn RenderBackend>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            backend,
            hook: None,
            config,
        }
    }

    /// Attach a side effect to run after every successful job.
    pub fn with_hook(mut self, hook: Arc<dyn SuccessHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run a job to its terminal state as a new attempt, in the caller's task.
    ///
    /// Returns `Err` when the render call failed and the effective
    /// continue-on-failure policy is off (the failure is recorded in the
    /// status store before the error is returned), or when a newer attempt
    /// took over the job while this one was rendering. A superseded attempt
    /// writes nothing and fires no success hook.
    pub async fn invoke(
        &self,
        job_id: &str,
        payload: serde_json::Value,
        options: InvokeOptions,
    ) -> Result<InvocationResult, CoreError> {
        let record = self.start(job_id, None).await?;
        if record.is_terminal() {
            return Ok(InvocationResult::from(&record));
        }
        self.run(job_id, record.attempt, payload, options).await
    }

    /// Write the initial record and run the job on a spawned task.
    ///
    /// With `attempt = Some(n)` the job continues attempt `n` (whose
    /// `pending` record the caller already wrote); with `None` a new attempt
    /// supersedes whatever is stored. Returns the record as written, before
    /// the render service is contacted.
    pub async fn dispatch(
        self: &Arc<Self>,
        job_id: &str,
        attempt: Option<u32>,
        payload: serde_json::Value,
        options: InvokeOptions,
    ) -> Result<JobStatusRecord, CoreError> {
        let record = self.start(job_id, attempt).await?;
        if record.is_terminal() {
            return Ok(record);
        }

        let invoker = Arc::clone(self);
        let job_id = job_id.to_string();
        let attempt = record.attempt;
        tokio::spawn(async move {
            if let Err(e) = invoker.run(&job_id, attempt, payload, options).await {
                tracing::warn!(job_id = %job_id, attempt, error = %e, "Background job failed");
            }
        });

        Ok(record)
    }

    /// Link included in notifications for `job_id`.
    pub fn download_link(&self, job_id: &str) -> String {
        format!(
            "{}/api/v1/jobs/{}/status",
            self.config.public_base_url.trim_end_matches('/'),
            job_id
        )
    }

    /// Write `skipped` (disabled) or `processing`.
    async fn start(&self, job_id: &str, attempt: Option<u32>) -> Result<JobStatusRecord, CoreError> {
        let record = if self.config.enabled {
            JobStatusRecord::processing(job_id, attempt.unwrap_or(0))
        } else {
            tracing::info!(job_id, "Document generation disabled, skipping job");
            JobStatusRecord::skipped(job_id, attempt.unwrap_or(0))
        };

        match attempt {
            None => Ok(self.store.begin_attempt(record).await),
            Some(_) if self.store.set(record.clone()).await => Ok(record),
            Some(attempt) => Err(superseded(job_id, attempt)),
        }
    }

    async fn run(
        &self,
        job_id: &str,
        attempt: u32,
        payload: serde_json::Value,
        options: InvokeOptions,
    ) -> Result<InvocationResult, CoreError> {
        let started = Instant::now();

        if !self.config.start_delay.is_zero() {
            tokio::time::sleep(self.config.start_delay).await;
        }

        let mut poller = ProgressPoller::new(
            job_id,
            attempt,
            Arc::clone(&self.store),
            Arc::clone(&self.backend),
            self.config.poll_interval,
            self.config.poll_timeout,
        );
        poller.start();

        let notify_email = options.parameters.notify_email.clone();
        let request = RenderRequest {
            job_id: job_id.to_string(),
            payload,
            parameters: options.parameters,
        };
        let outcome = self.render_with_retry(&request).await;
        poller.stop();

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let current = self
            .store
            .get(job_id)
            .await
            .filter(|record| record.attempt == attempt)
            .unwrap_or_else(|| JobStatusRecord::processing(job_id, attempt));

        match outcome {
            Ok(result) => {
                let record = current.into_success(result.clone());
                if !self.store.set(record.clone()).await {
                    return Err(superseded(job_id, attempt));
                }
                tracing::info!(job_id, attempt, elapsed_ms, "Document generation succeeded");

                self.notify(job_id, result, notify_email);
                Ok(InvocationResult::from(&record))
            }
            Err(e) => {
                let continued = options
                    .continue_on_failure
                    .unwrap_or(self.config.continue_on_failure);

                match &e {
                    RenderError::Unreachable { timed_out, .. } => tracing::warn!(
                        job_id,
                        attempt,
                        elapsed_ms,
                        timed_out,
                        error = %e,
                        "Render service unreachable",
                    ),
                    RenderError::Rejected(_) => tracing::warn!(
                        job_id,
                        attempt,
                        elapsed_ms,
                        error = %e,
                        "Render service reported an error",
                    ),
                }

                let err = CoreError::from(e);
                let record = current.into_failed(&err, continued);
                if !self.store.set(record.clone()).await {
                    return Err(superseded(job_id, attempt));
                }

                if continued {
                    Ok(InvocationResult::from(&record))
                } else {
                    Err(err)
                }
            }
        }
    }

    /// One render call under the configured deadline, retried with backoff
    /// on connection failures.
    async fn render_with_retry(
        &self,
        request: &RenderRequest,
    ) -> Result<serde_json::Value, RenderError> {
        let max_tries = self.config.render_max_attempts.max(1);
        let mut try_no = 1;

        loop {
            let outcome =
                match tokio::time::timeout(self.config.render_timeout, self.backend.render(request))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(RenderError::timed_out(format!(
                        "no answer within {}s",
                        self.config.render_timeout.as_secs()
                    ))),
                };

            match outcome {
                Err(e) if e.is_retryable() && try_no < max_tries => {
                    let delay = self.config.backoff.delay_for(try_no - 1);
                    tracing::warn!(
                        job_id = %request.job_id,
                        try_no,
                        max_tries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Render call failed, retrying",
                    );
                    tokio::time::sleep(delay).await;
                    try_no += 1;
                }
                other => return other,
            }
        }
    }

    /// Fire the success hook without waiting for it.
    fn notify(&self, job_id: &str, result: serde_json::Value, destination: Option<String>) {
        let Some(hook) = self.hook.clone() else {
            return;
        };

        let notification = JobNotification::new(job_id, result, self.download_link(job_id))
            .with_destination(destination);
        tokio::spawn(async move {
            if let Err(e) = hook.on_success(&notification).await {
                tracing::warn!(job_id = %notification.job_id, error = %e, "Success hook failed");
            }
        });
    }
}

fn superseded(job_id: &str, attempt: u32) -> CoreError {
    tracing::info!(job_id, attempt, "Attempt superseded by a newer one, dropping its outcome");
    CoreError::Internal(format!("job {job_id} attempt {attempt} was superseded"))
}
