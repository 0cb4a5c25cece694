mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use docgen_core::error::CoreError;
use docgen_core::job_status::{JobStatus, JobStatusRecord};
use docgen_core::params::RenderParameters;
use docgen_pipeline::stores::{
    InMemoryPayloadArchive, InMemorySubmissionStore, PayloadArchive, RegenerationRecord,
    StoreError, StoredSubmission, SubmissionStore,
};
use docgen_pipeline::{InvokeOptions, PipelineInvoker, RetryOrchestrator};
use serde_json::json;

use common::{fast_config, invoker, wait_for_terminal, FakeBackend};

struct Fixture {
    backend: Arc<FakeBackend>,
    invoker: Arc<PipelineInvoker>,
    submissions: Arc<InMemorySubmissionStore>,
    archive: Arc<InMemoryPayloadArchive>,
    retry: RetryOrchestrator,
}

fn fixture(backend: FakeBackend) -> Fixture {
    let backend = Arc::new(backend);
    let invoker = invoker(backend.clone(), fast_config());
    let submissions = Arc::new(InMemorySubmissionStore::new());
    let archive = Arc::new(InMemoryPayloadArchive::new());
    let retry = RetryOrchestrator::new(invoker.clone(), submissions.clone(), archive.clone());
    Fixture {
        backend,
        invoker,
        submissions,
        archive,
        retry,
    }
}

fn original(job_id: &str) -> StoredSubmission {
    StoredSubmission::new(
        job_id,
        json!({"petitioner": "Ada"}),
        &RenderParameters::new(["petition"]).with_notify_email("ada@example.com"),
    )
}

#[tokio::test]
async fn missing_payload_is_not_found_and_leaves_status_alone() {
    let f = fixture(FakeBackend::succeeding(json!({})));
    let done = JobStatusRecord::processing("case-9", 1).into_success(json!({"documents": 1}));
    f.invoker.store().set(done).await;
    let before = f.invoker.store().get("case-9").await.unwrap();

    let err = f
        .retry
        .retry("case-9", RenderParameters::new(["summons"]))
        .await
        .unwrap_err();

    assert_matches!(err, CoreError::NotFound { id, .. } if id == "case-9");
    assert_eq!(f.invoker.store().get("case-9").await.unwrap(), before);
    assert_eq!(f.backend.render_calls(), 0);
    assert!(f.submissions.regeneration_history("case-9").await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_parameters_are_rejected_up_front() {
    let f = fixture(FakeBackend::succeeding(json!({})));
    f.submissions.save(&original("case-20")).await.unwrap();

    let err = f
        .retry
        .retry_in_background("case-20", RenderParameters::new(Vec::<String>::new()))
        .await
        .unwrap_err();

    assert_matches!(err, CoreError::Validation(_));
    assert!(f.invoker.store().get("case-20").await.is_none());
    assert_eq!(f.backend.render_calls(), 0);
}

#[tokio::test]
async fn retry_from_primary_store_updates_parameters_and_history() {
    let f = fixture(FakeBackend::succeeding(json!({"documents": 1})));
    f.submissions.save(&original("case-21")).await.unwrap();
    f.invoker
        .invoke(
            "case-21",
            json!({"petitioner": "Ada"}),
            InvokeOptions::new(RenderParameters::new(["petition"])),
        )
        .await
        .unwrap();

    let result = f
        .retry
        .retry("case-21", RenderParameters::new(["summons"]))
        .await
        .unwrap();

    assert_eq!(result.status, JobStatus::Success);
    assert_eq!(result.attempt, 2);

    let requests = f.backend.requests();
    let last = requests.last().unwrap();
    assert_eq!(last.payload, json!({"petitioner": "Ada"}));
    assert_eq!(last.parameters.outputs, vec!["summons".to_string()]);
    assert_eq!(last.parameters.notify_email.as_deref(), Some("ada@example.com"));

    let stored = f.submissions.find("case-21").await.unwrap().unwrap();
    assert_eq!(stored.parameters().unwrap().outputs, vec!["summons".to_string()]);
    let history = f.submissions.regeneration_history("case-21").await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn retry_falls_back_to_archive() {
    let f = fixture(FakeBackend::succeeding(json!({})));
    f.archive.put(&original("case-22")).await.unwrap();

    let result = f
        .retry
        .retry("case-22", RenderParameters::new(["summons"]))
        .await
        .unwrap();

    assert_eq!(result.status, JobStatus::Success);
    assert_eq!(result.attempt, 1);
    assert_eq!(f.backend.requests()[0].payload, json!({"petitioner": "Ada"}));
    assert!(f.submissions.find("case-22").await.unwrap().is_none());
}

#[tokio::test]
async fn background_retry_resets_a_finished_job() {
    let f = fixture(FakeBackend::succeeding(json!({})).with_delay(Duration::from_millis(80)));
    f.submissions.save(&original("case-23")).await.unwrap();
    f.invoker
        .invoke(
            "case-23",
            json!({}),
            InvokeOptions::new(RenderParameters::new(["petition"])),
        )
        .await
        .unwrap();
    assert!(f.invoker.store().get("case-23").await.unwrap().is_terminal());

    let restarted = f
        .retry
        .retry_in_background("case-23", RenderParameters::new(["summons"]))
        .await
        .unwrap();

    assert_eq!(restarted.status, JobStatus::Processing);
    assert_eq!(restarted.attempt, 2);
    assert_eq!(
        f.invoker.store().get("case-23").await.unwrap().status,
        JobStatus::Processing
    );

    let done = wait_for_terminal(f.invoker.store(), "case-23").await;
    assert_eq!(done.status, JobStatus::Success);
    assert_eq!(done.attempt, 2);
}

/// Primary store that is down.
struct BrokenStore;

#[async_trait]
impl SubmissionStore for BrokenStore {
    async fn save(&self, _: &StoredSubmission) -> Result<(), StoreError> {
        Err(broken())
    }

    async fn find(&self, _: &str) -> Result<Option<StoredSubmission>, StoreError> {
        Err(broken())
    }

    async fn update_parameters(&self, _: &str, _: &RenderParameters) -> Result<bool, StoreError> {
        Err(broken())
    }

    async fn record_regeneration(&self, _: &str, _: &RenderParameters) -> Result<(), StoreError> {
        Err(broken())
    }

    async fn regeneration_history(&self, _: &str) -> Result<Vec<RegenerationRecord>, StoreError> {
        Err(broken())
    }
}

fn broken() -> StoreError {
    StoreError::Io(std::io::Error::other("connection reset"))
}

#[tokio::test]
async fn broken_primary_store_does_not_block_retry() {
    let backend = Arc::new(FakeBackend::succeeding(json!({})));
    let invoker = invoker(backend, fast_config());
    let archive = Arc::new(InMemoryPayloadArchive::new());
    archive.put(&original("case-24")).await.unwrap();
    let retry = RetryOrchestrator::new(invoker, Arc::new(BrokenStore), archive);

    let result = retry
        .retry("case-24", RenderParameters::new(["summons"]))
        .await
        .unwrap();
    assert_eq!(result.status, JobStatus::Success);
}
