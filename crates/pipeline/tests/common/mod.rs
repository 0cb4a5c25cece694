#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use docgen_core::job_status::{DocumentProgress, JobStatusRecord};
use docgen_events::delivery::webhook::WebhookError;
use docgen_events::{HookError, JobNotification, SuccessHook};
use docgen_pipeline::{PipelineConfig, PipelineInvoker, StatusStore};
use docgen_render::backoff::BackoffConfig;
use docgen_render::{RenderBackend, RenderError, RenderRequest};

/// Render backend whose answers are scripted per test.
///
/// Queued outcomes are consumed one per render call; once the queue is
/// empty every call returns `fallback`.
pub struct FakeBackend {
    queued: Mutex<VecDeque<Result<serde_json::Value, RenderError>>>,
    fallback: Result<serde_json::Value, RenderError>,
    render_delay: Duration,
    progress: DocumentProgress,
    render_calls: AtomicU32,
    progress_calls: AtomicU32,
    requests: Mutex<Vec<RenderRequest>>,
}

impl FakeBackend {
    pub fn succeeding(result: serde_json::Value) -> Self {
        Self::with_fallback(Ok(result))
    }

    pub fn failing(err: RenderError) -> Self {
        Self::with_fallback(Err(err))
    }

    fn with_fallback(fallback: Result<serde_json::Value, RenderError>) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback,
            render_delay: Duration::ZERO,
            progress: DocumentProgress::default(),
            render_calls: AtomicU32::new(0),
            progress_calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer the next render call with `outcome` before falling back.
    pub fn then(self, outcome: Result<serde_json::Value, RenderError>) -> Self {
        self.queued.lock().unwrap().push_back(outcome);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.render_delay = delay;
        self
    }

    pub fn with_progress(mut self, progress: DocumentProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn render_calls(&self) -> u32 {
        self.render_calls.load(Ordering::SeqCst)
    }

    pub fn progress_calls(&self) -> u32 {
        self.progress_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RenderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RenderBackend for FakeBackend {
    async fn render(&self, request: &RenderRequest) -> Result<serde_json::Value, RenderError> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if !self.render_delay.is_zero() {
            tokio::time::sleep(self.render_delay).await;
        }
        let next = self.queued.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    async fn progress(&self, _job_id: &str) -> Result<DocumentProgress, RenderError> {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.progress.clone())
    }
}

/// Success hook that remembers every notification.
#[derive(Default)]
pub struct RecordingHook {
    seen: Mutex<Vec<JobNotification>>,
    fail: bool,
}

impl RecordingHook {
    pub fn failing() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn seen(&self) -> Vec<JobNotification> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SuccessHook for RecordingHook {
    async fn on_success(&self, notification: &JobNotification) -> Result<(), HookError> {
        self.seen.lock().unwrap().push(notification.clone());
        if self.fail {
            Err(HookError::Webhook(WebhookError::HttpStatus(500)))
        } else {
            Ok(())
        }
    }
}

pub fn unreachable() -> RenderError {
    RenderError::Unreachable {
        message: "connection refused".into(),
        timed_out: false,
    }
}

/// Pipeline settings scaled down to tens of milliseconds.
pub fn fast_config() -> PipelineConfig {
    PipelineConfig {
        start_delay: Duration::ZERO,
        render_timeout: Duration::from_secs(2),
        backoff: BackoffConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
            multiplier: 2.0,
        },
        poll_interval: Duration::from_millis(20),
        poll_timeout: Duration::from_millis(20),
        public_base_url: "https://docs.test".into(),
        ..PipelineConfig::default()
    }
}

pub fn invoker(backend: Arc<FakeBackend>, config: PipelineConfig) -> Arc<PipelineInvoker> {
    Arc::new(PipelineInvoker::new(
        Arc::new(StatusStore::default()),
        backend,
        config,
    ))
}

/// Poll the store until `job_id` is terminal, or panic after 2s.
pub async fn wait_for_terminal(store: &StatusStore, job_id: &str) -> JobStatusRecord {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if let Some(record) = store.get(job_id).await {
            if record.is_terminal() {
                return record;
            }
        }
        if tokio::time::Instant::now() > deadline {
            panic!("job {job_id} did not finish in time");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
