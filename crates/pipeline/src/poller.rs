//! Periodic sub-progress polling for one running job.
//!
//! The poller queries the render service's progress endpoint on a fixed
//! interval and folds each report into the job's status record. It never
//! creates a record and never touches a terminal one: all writes go through
//! [`StatusStore::update`], which skips records that are gone, finished, or
//! belong to a newer attempt.
//!
//! A poller stops when [`ProgressPoller::stop`] is called or when it is
//! dropped, whichever comes first.

use std::sync::Arc;
use std::time::Duration;

use docgen_render::RenderBackend;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::store::StatusStore;

/// Handle to a background progress-polling loop.
pub struct ProgressPoller {
    job_id: String,
    attempt: u32,
    store: Arc<StatusStore>,
    backend: Arc<dyn RenderBackend>,
    interval: Duration,
    tick_timeout: Duration,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ProgressPoller {
    pub fn new(
        job_id: impl Into<String>,
        attempt: u32,
        store: Arc<StatusStore>,
        backend: Arc<dyn RenderBackend>,
        interval: Duration,
        tick_timeout: Duration,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            attempt,
            store,
            backend,
            interval,
            tick_timeout,
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// Spawn the polling loop. The first query happens one interval from now.
    ///
    /// Calling `start` on a running or stopped poller does nothing.
    pub fn start(&mut self) {
        if self.task.is_some() || self.cancel.is_cancelled() {
            return;
        }

        let job_id = self.job_id.clone();
        let attempt = self.attempt;
        let store = Arc::clone(&self.store);
        let backend = Arc::clone(&self.backend);
        let period = self.interval;
        let tick_timeout = self.tick_timeout;
        let cancel = self.cancel.clone();

        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::debug!(job_id = %job_id, attempt, "Progress poller started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = poll_once(&job_id, attempt, &store, backend.as_ref(), tick_timeout) => {}
                        }
                    }
                }
            }

            tracing::debug!(job_id = %job_id, attempt, "Progress poller stopped");
        }));
    }

    /// Stop the polling loop. Safe to call any number of times, and on a
    /// poller that was never started.
    ///
    /// An in-flight query is abandoned; no write happens after `stop` returns
    /// that was not already under way.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for ProgressPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One tick: query, then merge. Every failure is absorbed.
async fn poll_once(
    job_id: &str,
    attempt: u32,
    store: &StatusStore,
    backend: &dyn RenderBackend,
    tick_timeout: Duration,
) {
    let report = match tokio::time::timeout(tick_timeout, backend.progress(job_id)).await {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => {
            tracing::debug!(job_id, error = %e, "Progress query failed, skipping tick");
            return;
        }
        Err(_) => {
            tracing::debug!(
                job_id,
                timeout_ms = tick_timeout.as_millis() as u64,
                "Progress query timed out, skipping tick",
            );
            return;
        }
    };

    if report.total == 0 {
        return;
    }

    let applied = store
        .update(job_id, attempt, |record| record.apply_document_progress(report))
        .await;
    if !applied {
        tracing::debug!(job_id, attempt, "Progress report arrived after the job moved on");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use docgen_core::job_status::{DocumentProgress, JobStatus, JobStatusRecord};
    use docgen_render::{RenderError, RenderRequest};

    use super::*;

    /// Reports one more completed document on every query, out of 4.
    struct CountingBackend {
        calls: AtomicU32,
    }

    #[async_trait]
    impl RenderBackend for CountingBackend {
        async fn render(&self, _: &RenderRequest) -> Result<serde_json::Value, RenderError> {
            Ok(serde_json::Value::Null)
        }

        async fn progress(&self, _: &str) -> Result<DocumentProgress, RenderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(DocumentProgress {
                completed: n.min(4),
                total: 4,
                current_item_label: Some(format!("doc-{n}")),
            })
        }
    }

    fn counting() -> Arc<CountingBackend> {
        Arc::new(CountingBackend {
            calls: AtomicU32::new(0),
        })
    }

    #[tokio::test]
    async fn stop_is_idempotent_without_start() {
        let store = Arc::new(StatusStore::default());
        let mut poller = ProgressPoller::new(
            "case-1",
            1,
            store,
            counting(),
            Duration::from_millis(10),
            Duration::from_millis(10),
        );
        poller.stop();
        poller.stop();
        assert!(!poller.is_running());

        // A stopped poller cannot be restarted.
        poller.start();
        assert!(!poller.is_running());
    }

    #[tokio::test]
    async fn folds_progress_into_store() {
        let store = Arc::new(StatusStore::default());
        store.set(JobStatusRecord::processing("case-1", 1)).await;
        let backend = counting();

        let mut poller = ProgressPoller::new(
            "case-1",
            1,
            Arc::clone(&store),
            backend.clone(),
            Duration::from_millis(20),
            Duration::from_millis(50),
        );
        poller.start();
        assert!(poller.is_running());
        tokio::time::sleep(Duration::from_millis(110)).await;
        poller.stop();
        poller.stop();

        let record = store.get("case-1").await.unwrap();
        assert_eq!(record.status, JobStatus::Processing);
        assert!(record.progress > 10);
        assert!(record.progress <= 90);
        let docs = record.document_progress.unwrap();
        assert_eq!(docs.total, 4);
        assert!(docs.completed >= 1);
        assert!(backend.calls.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn never_touches_terminal_record() {
        let store = Arc::new(StatusStore::default());
        let done = JobStatusRecord::processing("case-2", 1).into_success(serde_json::json!({}));
        store.set(done).await;

        let mut poller = ProgressPoller::new(
            "case-2",
            1,
            Arc::clone(&store),
            counting(),
            Duration::from_millis(10),
            Duration::from_millis(50),
        );
        poller.start();
        tokio::time::sleep(Duration::from_millis(60)).await;
        drop(poller);

        let record = store.get("case-2").await.unwrap();
        assert_eq!(record.status, JobStatus::Success);
        assert_eq!(record.progress, 100);
    }

    #[tokio::test]
    async fn drop_stops_polling() {
        let store = Arc::new(StatusStore::default());
        store.set(JobStatusRecord::processing("case-3", 1)).await;
        let backend = counting();

        {
            let mut poller = ProgressPoller::new(
                "case-3",
                1,
                Arc::clone(&store),
                backend.clone(),
                Duration::from_millis(10),
                Duration::from_millis(50),
            );
            poller.start();
            tokio::time::sleep(Duration::from_millis(35)).await;
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_drop = backend.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), after_drop);
    }
}
