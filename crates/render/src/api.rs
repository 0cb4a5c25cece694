//! REST API client for the render/normalize service.
//!
//! Wraps the two HTTP endpoints the pipeline needs (the long-running
//! render call and the companion progress query) using [`reqwest`].

use async_trait::async_trait;
use docgen_core::job_status::DocumentProgress;
use serde::Deserialize;

use crate::backend::{RenderBackend, RenderError, RenderRequest};

/// Longest response body kept in a rejection message.
const MAX_ERROR_BODY_LEN: usize = 512;

/// HTTP client for a single render service deployment.
pub struct RenderApi {
    client: reqwest::Client,
    api_url: String,
}

/// Response returned by `POST /normalize`.
#[derive(Debug, Deserialize)]
pub struct RenderResponse {
    /// Whether the service produced the requested documents.
    pub success: bool,
    /// Failure reason when `success` is false.
    #[serde(default)]
    pub message: Option<String>,
    /// Summary of what was produced.
    #[serde(default)]
    pub result: serde_json::Value,
}

/// Response returned by `GET /progress/{job_id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    #[serde(default)]
    pub completed: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub current_item_label: Option<String>,
}

/// Errors from the render REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum RenderApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Render API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The configured base URL cannot carry a path.
    #[error("Invalid render service URL: {0}")]
    InvalidUrl(String),
}

impl RenderApi {
    /// Create a new API client.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://render:8090`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base HTTP URL of the service.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Submit a job for normalization and rendering.
    ///
    /// Sends `POST /normalize` and waits for the service to finish. The
    /// service answers `200` with `success: false` when it rejects a job.
    pub async fn normalize(
        &self,
        request: &RenderRequest,
    ) -> Result<RenderResponse, RenderApiError> {
        let response = self
            .client
            .post(format!("{}/normalize", self.api_url))
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch per-document progress for a running job.
    ///
    /// Sends `GET /progress/{job_id}`.
    pub async fn get_progress(&self, job_id: &str) -> Result<ProgressResponse, RenderApiError> {
        let response = self.client.get(self.progress_url(job_id)?).send().await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// `{api_url}/progress/{job_id}`, with the job id percent-encoded as a
    /// single path segment.
    fn progress_url(&self, job_id: &str) -> Result<reqwest::Url, RenderApiError> {
        let mut url = reqwest::Url::parse(&self.api_url)
            .map_err(|e| RenderApiError::InvalidUrl(format!("{}: {e}", self.api_url)))?;
        url.path_segments_mut()
            .map_err(|()| RenderApiError::InvalidUrl(self.api_url.clone()))?
            .pop_if_empty()
            .push("progress")
            .push(job_id);
        Ok(url)
    }

    /// Ensure the response has a success status code, capturing the status
    /// and body text otherwise.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RenderApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RenderApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RenderApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Classify a REST-layer error into the pipeline's two failure classes.
///
/// Gateway statuses (502-504) mean the service itself was not reached.
/// Every other non-2xx answer is the service rejecting the job.
pub fn classify(err: RenderApiError) -> RenderError {
    match err {
        RenderApiError::Request(e) => RenderError::Unreachable {
            timed_out: e.is_timeout(),
            message: e.to_string(),
        },
        RenderApiError::ApiError { status, .. } if (502..=504).contains(&status) => {
            RenderError::Unreachable {
                message: format!("gateway returned HTTP {status}"),
                timed_out: status == 504,
            }
        }
        RenderApiError::ApiError { status, body } => {
            let body: String = body.chars().take(MAX_ERROR_BODY_LEN).collect();
            RenderError::Rejected(format!("HTTP {status}: {body}"))
        }
        RenderApiError::InvalidUrl(message) => RenderError::Unreachable {
            message,
            timed_out: false,
        },
    }
}

#[async_trait]
impl RenderBackend for RenderApi {
    async fn render(&self, request: &RenderRequest) -> Result<serde_json::Value, RenderError> {
        let response = self.normalize(request).await.map_err(classify)?;

        if response.success {
            Ok(response.result)
        } else {
            Err(RenderError::Rejected(
                response
                    .message
                    .unwrap_or_else(|| "no reason given".to_string()),
            ))
        }
    }

    async fn progress(&self, job_id: &str) -> Result<DocumentProgress, RenderError> {
        let response = self.get_progress(job_id).await.map_err(classify)?;

        Ok(DocumentProgress {
            completed: response.completed,
            total: response.total,
            current_item_label: response.current_item_label,
        })
    }
}
