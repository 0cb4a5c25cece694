//! "Your documents are ready" emails over SMTP.
//!
//! The transport and sender mailbox are built once, when the channel is
//! configured, so a bad `SMTP_FROM` or relay host is reported at startup
//! instead of on the first finished job.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::notification::JobNotification;

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_FROM_ADDRESS: &str = "noreply@docgen.local";

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(#[from] lettre::error::Error),
}

/// SMTP settings. Present only when `SMTP_HOST` is set.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_address: String,
    /// Username and password; both or neither.
    pub credentials: Option<(String, String)>,
}

impl EmailConfig {
    /// Read `SMTP_HOST`, `SMTP_PORT` (587), `SMTP_FROM`
    /// (`noreply@docgen.local`), `SMTP_USER` and `SMTP_PASSWORD`.
    ///
    /// Returns `None` when `SMTP_HOST` is unset or blank, which disables the
    /// email channel.
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST")
            .ok()
            .filter(|host| !host.trim().is_empty())?;

        let smtp_port = match std::env::var("SMTP_PORT") {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Ignoring invalid SMTP_PORT");
                DEFAULT_SMTP_PORT
            }),
            Err(_) => DEFAULT_SMTP_PORT,
        };

        let credentials = match (std::env::var("SMTP_USER"), std::env::var("SMTP_PASSWORD")) {
            (Ok(user), Ok(password)) => Some((user, password)),
            _ => None,
        };

        Some(Self {
            smtp_host,
            smtp_port,
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            credentials,
        })
    }
}

/// The email notification channel.
pub struct EmailDelivery {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailDelivery {
    /// Build the STARTTLS transport and parse the sender address.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);
        if let Some((user, password)) = &config.credentials {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            from: config.from_address.parse()?,
        })
    }

    /// Email `to` that the job's documents are ready.
    pub async fn deliver(&self, to: &str, notification: &JobNotification) -> Result<(), EmailError> {
        let message = build_message(self.from.clone(), to.parse()?, notification)?;
        self.mailer.send(message).await?;

        tracing::info!(job_id = %notification.job_id, to, "Notification email sent");
        Ok(())
    }
}

fn build_message(
    from: Mailbox,
    to: Mailbox,
    notification: &JobNotification,
) -> Result<Message, EmailError> {
    let summary = serde_json::to_string_pretty(&notification.result).unwrap_or_default();
    let body = format!(
        "The documents for job {job} are ready.\n\n\
         Status: {link}\n\
         Finished at: {finished}\n\n\
         Summary:\n{summary}\n",
        job = notification.job_id,
        link = notification.link,
        finished = notification.completed_at.to_rfc3339(),
    );

    Ok(Message::builder()
        .from(from)
        .to(to)
        .subject(format!("Documents ready: {}", notification.job_id))
        .header(ContentType::TEXT_PLAIN)
        .body(body)?)
}
