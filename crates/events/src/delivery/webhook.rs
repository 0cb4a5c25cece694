//! Completion webhook: a JSON POST per finished job, retried on failure.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::notification::{JobNotification, EVENT_JOB_COMPLETED};

/// Waits before the second, third and fourth attempt.
const DEFAULT_RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// Deadline of a single POST.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Header naming the event, so receivers can route without parsing.
const EVENT_HEADER: &str = "x-docgen-event";

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

/// Body POSTed to the endpoint.
#[derive(Debug, Serialize)]
struct WebhookBody<'a> {
    event_type: &'static str,
    job_id: &'a str,
    result: &'a serde_json::Value,
    link: &'a str,
    timestamp: DateTime<Utc>,
}

impl<'a> From<&'a JobNotification> for WebhookBody<'a> {
    fn from(notification: &'a JobNotification) -> Self {
        Self {
            event_type: EVENT_JOB_COMPLETED,
            job_id: &notification.job_id,
            result: &notification.result,
            link: &notification.link,
            timestamp: notification.completed_at,
        }
    }
}

/// The webhook notification channel.
pub struct WebhookDelivery {
    client: reqwest::Client,
    url: String,
    retry_delays: Vec<Duration>,
}

impl WebhookDelivery {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            url: url.into(),
            retry_delays: DEFAULT_RETRY_DELAYS.to_vec(),
        }
    }

    /// `NOTIFY_WEBHOOK_URL`, or `None` when unset or blank.
    pub fn from_env() -> Option<Self> {
        std::env::var("NOTIFY_WEBHOOK_URL")
            .ok()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .map(Self::new)
    }

    /// Replace the waits between attempts. One attempt is made per entry,
    /// plus the first.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST the notification, retrying on any failure until the schedule is
    /// exhausted. The last error is returned.
    pub async fn deliver(&self, notification: &JobNotification) -> Result<(), WebhookError> {
        let body = WebhookBody::from(notification);
        let mut waits = self.retry_delays.iter();
        let mut attempt = 1u32;

        loop {
            let err = match self.post(&body).await {
                Ok(()) => {
                    tracing::debug!(job_id = %notification.job_id, attempt, "Webhook delivered");
                    return Ok(());
                }
                Err(e) => e,
            };

            let Some(wait) = waits.next() else {
                tracing::error!(
                    job_id = %notification.job_id,
                    url = %self.url,
                    attempts = attempt,
                    error = %err,
                    "Webhook delivery gave up",
                );
                return Err(err);
            };

            tracing::warn!(
                job_id = %notification.job_id,
                attempt,
                retry_in_ms = wait.as_millis() as u64,
                error = %err,
                "Webhook delivery failed",
            );
            tokio::time::sleep(*wait).await;
            attempt += 1;
        }
    }

    async fn post(&self, body: &WebhookBody<'_>) -> Result<(), WebhookError> {
        let response = self
            .client
            .post(&self.url)
            .header(EVENT_HEADER, body.event_type)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(WebhookError::HttpStatus(status.as_u16()))
        }
    }
}
