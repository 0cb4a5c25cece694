#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use docgen_api::config::{ServerConfig, StreamSettings};
use docgen_api::router::build_app_router;
use docgen_api::state::AppState;
use docgen_core::job_status::DocumentProgress;
use docgen_pipeline::stores::{InMemoryPayloadArchive, InMemorySubmissionStore};
use docgen_pipeline::{PipelineConfig, PipelineInvoker, StatusStore};
use docgen_render::{RenderBackend, RenderError, RenderRequest};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
///
/// Stream timings are scaled down so a whole push stream fits in a test.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        database_url: None,
        payload_archive_dir: "unused".to_string(),
        status_ttl: Duration::from_secs(60),
        status_sweep_interval: Duration::from_secs(60),
        stream: StreamSettings {
            poll_interval: Duration::from_millis(20),
            heartbeat_interval: Duration::from_secs(5),
            close_grace: Duration::from_millis(10),
        },
    }
}

/// Pipeline settings for HTTP tests: no start delay, fast polling.
pub fn test_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        start_delay: Duration::ZERO,
        render_timeout: Duration::from_secs(2),
        poll_interval: Duration::from_millis(20),
        poll_timeout: Duration::from_millis(20),
        public_base_url: "https://docs.test".into(),
        ..PipelineConfig::default()
    }
}

/// Render backend that waits `delay`, then succeeds or rejects.
pub struct StubBackend {
    delay: Duration,
    reject: bool,
    calls: AtomicU32,
}

impl StubBackend {
    pub fn succeeding() -> Self {
        Self {
            delay: Duration::ZERO,
            reject: false,
            calls: AtomicU32::new(0),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::succeeding()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderBackend for StubBackend {
    async fn render(&self, request: &RenderRequest) -> Result<serde_json::Value, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.reject {
            Err(RenderError::Rejected("template missing".into()))
        } else {
            Ok(serde_json::json!({ "outputs": request.parameters.outputs }))
        }
    }

    async fn progress(&self, _job_id: &str) -> Result<DocumentProgress, RenderError> {
        Ok(DocumentProgress {
            completed: 1,
            total: 2,
            current_item_label: Some("summons".into()),
        })
    }
}

/// Application under test, with handles on its shared state.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub backend: Arc<StubBackend>,
}

/// Build the full application router over in-memory stores.
///
/// Uses the same `build_app_router` as `main.rs`, so requests pass through
/// the production middleware stack.
pub fn build_test_app(backend: StubBackend) -> TestApp {
    build_test_app_with(backend, test_config())
}

/// [`build_test_app`] with a caller-supplied server config.
pub fn build_test_app_with(backend: StubBackend, config: ServerConfig) -> TestApp {
    let backend = Arc::new(backend);
    let invoker = PipelineInvoker::new(
        Arc::new(StatusStore::default()),
        Arc::clone(&backend) as Arc<dyn RenderBackend>,
        test_pipeline_config(),
    );
    let state = AppState::new(
        config,
        None,
        Arc::new(invoker),
        Arc::new(InMemorySubmissionStore::new()),
        Arc::new(InMemoryPayloadArchive::new()),
    );

    TestApp {
        router: build_app_router(state.clone()),
        state,
        backend,
    }
}

/// Send a GET request.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a POST request with a JSON body.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect a response body as text, failing the test if it does not end
/// within `limit`.
pub async fn body_text(response: Response<Body>, limit: Duration) -> String {
    let bytes = tokio::time::timeout(limit, response.into_body().collect())
        .await
        .expect("response body did not end in time")
        .unwrap()
        .to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Read whatever the body yields during `window`, then drop it, which
/// disconnects a push stream the way a closed browser tab does.
pub async fn body_text_for(response: Response<Body>, window: Duration) -> String {
    let mut body = response.into_body();
    let deadline = tokio::time::Instant::now() + window;
    let mut text = String::new();
    while let Ok(Some(frame)) = tokio::time::timeout_at(deadline, body.frame()).await {
        if let Ok(data) = frame.unwrap().into_data() {
            text.push_str(std::str::from_utf8(&data).unwrap());
        }
    }
    text
}

/// Number of heartbeat comment frames in a raw SSE body.
pub fn heartbeat_count(text: &str) -> usize {
    text.lines()
        .filter(|line| line.starts_with(':') && line.contains("heartbeat"))
        .count()
}

/// Poll the registry until no stream is open, or panic after `limit`.
pub async fn wait_for_no_streams(state: &AppState, limit: Duration) {
    let deadline = tokio::time::Instant::now() + limit;
    while state.subscribers.connection_count().await > 0 {
        if tokio::time::Instant::now() > deadline {
            panic!("push streams still open after {limit:?}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// One parsed SSE frame. Comment frames are dropped.
#[derive(Debug, Clone)]
pub struct SseFrame {
    pub event: String,
    pub data: serde_json::Value,
}

pub fn parse_sse(text: &str) -> Vec<SseFrame> {
    text.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data = String::new();
            for line in block.lines() {
                if let Some(name) = line.strip_prefix("event:") {
                    event = Some(name.trim().to_string());
                } else if let Some(chunk) = line.strip_prefix("data:") {
                    data.push_str(chunk.trim_start());
                }
            }
            let event = event?;
            Some(SseFrame {
                event,
                data: serde_json::from_str(&data).unwrap(),
            })
        })
        .collect()
}

/// A minimal valid submission body.
pub fn submission(job_id: &str) -> serde_json::Value {
    serde_json::json!({
        "jobId": job_id,
        "payload": { "plaintiff": "A. Jones", "court": "District 4" },
        "parameters": { "outputs": ["petition", "summons"] },
    })
}

/// Poll the status store until `job_id` is terminal, or panic after 2s.
pub async fn wait_for_terminal(state: &AppState, job_id: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if let Some(record) = state.status_store.get(job_id).await {
            if record.is_terminal() {
                return;
            }
        }
        if tokio::time::Instant::now() > deadline {
            panic!("job {job_id} did not finish in time");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
