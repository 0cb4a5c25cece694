use crate::job_status::ErrorKind;

/// Longest upstream message carried into a status record.
const MAX_DISPLAY_MESSAGE_LEN: usize = 240;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Render service unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("Render service rejected the job: {0}")]
    UpstreamRejected(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable error kind for clients, or `None` for internal failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            CoreError::NotFound { .. } => Some(ErrorKind::NotFound),
            CoreError::Validation(_) => Some(ErrorKind::InvalidParameters),
            CoreError::UpstreamUnreachable(_) => Some(ErrorKind::UpstreamUnreachable),
            CoreError::UpstreamRejected(_) => Some(ErrorKind::UpstreamRejected),
            CoreError::Internal(_) => None,
        }
    }

    /// Short message that is safe to show to end users.
    ///
    /// Transport details stay in the logs; only the upstream's own
    /// rejection reason is passed through, truncated.
    pub fn display_message(&self) -> String {
        match self {
            CoreError::NotFound { entity, id } => format!("{entity} {id} not found"),
            CoreError::Validation(msg) => msg.clone(),
            CoreError::UpstreamUnreachable(_) => "Document service unreachable".to_string(),
            CoreError::UpstreamRejected(msg) => {
                let msg: String = msg.chars().take(MAX_DISPLAY_MESSAGE_LEN).collect();
                format!("Document service reported an error: {msg}")
            }
            CoreError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}
