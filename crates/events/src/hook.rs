//! The post-success hook seam and its production implementation.

use async_trait::async_trait;

use crate::delivery::email::{EmailConfig, EmailDelivery, EmailError};
use crate::delivery::webhook::{WebhookDelivery, WebhookError};
use crate::notification::JobNotification;

/// Error type for a failed side effect. Always absorbed by the caller.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),
}

/// Side effect run after a job succeeds.
///
/// Implementations are invoked fire-and-forget; an `Err` is logged and
/// never changes the job's status.
#[async_trait]
pub trait SuccessHook: Send + Sync {
    async fn on_success(&self, notification: &JobNotification) -> Result<(), HookError>;
}

/// Sends success notifications over every configured channel.
#[derive(Default)]
pub struct NotificationDispatcher {
    email: Option<EmailDelivery>,
    webhook: Option<WebhookDelivery>,
}

impl NotificationDispatcher {
    pub fn new(email: Option<EmailDelivery>, webhook: Option<WebhookDelivery>) -> Self {
        Self { email, webhook }
    }

    /// Build the dispatcher from `SMTP_*` and `NOTIFY_WEBHOOK_URL`.
    ///
    /// A configured but unusable email channel is logged and left out.
    pub fn from_env() -> Self {
        let email = EmailConfig::from_env().and_then(|config| {
            EmailDelivery::new(&config)
                .inspect_err(|e| {
                    tracing::error!(host = %config.smtp_host, error = %e, "Email channel disabled");
                })
                .ok()
        });
        Self::new(email, WebhookDelivery::from_env())
    }

    /// Whether no channel is configured at all.
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.webhook.is_none()
    }
}

#[async_trait]
impl SuccessHook for NotificationDispatcher {
    /// Try every channel; report the first failure after all have run.
    async fn on_success(&self, notification: &JobNotification) -> Result<(), HookError> {
        let mut first_err: Option<HookError> = None;

        if let (Some(email), Some(to)) = (&self.email, notification.destination.as_deref()) {
            if let Err(e) = email.deliver(to, notification).await {
                tracing::warn!(job_id = %notification.job_id, error = %e, "Email notification failed");
                first_err.get_or_insert(e.into());
            }
        }

        if let Some(webhook) = &self.webhook {
            if let Err(e) = webhook.deliver(notification).await {
                first_err.get_or_insert(e.into());
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
