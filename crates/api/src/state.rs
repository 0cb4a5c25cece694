use std::sync::Arc;

use docgen_pipeline::stores::{PayloadArchive, SubmissionStore};
use docgen_pipeline::{PipelineInvoker, RetryOrchestrator, StatusStore};

use crate::config::ServerConfig;
use crate::stream::SubscriberRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, when a database is configured.
    pub pool: Option<docgen_db::DbPool>,
    pub config: Arc<ServerConfig>,
    /// Job status records shared by the invoker, the pollers and every stream.
    pub status_store: Arc<StatusStore>,
    pub invoker: Arc<PipelineInvoker>,
    pub retry: Arc<RetryOrchestrator>,
    /// Primary store of original submissions.
    pub submissions: Arc<dyn SubmissionStore>,
    /// Fallback store of original submissions.
    pub archive: Arc<dyn PayloadArchive>,
    /// Open push-stream connections.
    pub subscribers: Arc<SubscriberRegistry>,
}

impl AppState {
    /// Wire the state around an invoker; the status store is the invoker's.
    pub fn new(
        config: ServerConfig,
        pool: Option<docgen_db::DbPool>,
        invoker: Arc<PipelineInvoker>,
        submissions: Arc<dyn SubmissionStore>,
        archive: Arc<dyn PayloadArchive>,
    ) -> Self {
        let retry = RetryOrchestrator::new(
            Arc::clone(&invoker),
            Arc::clone(&submissions),
            Arc::clone(&archive),
        );

        Self {
            pool,
            config: Arc::new(config),
            status_store: Arc::clone(invoker.store()),
            invoker,
            retry: Arc::new(retry),
            submissions,
            archive,
            subscribers: Arc::new(SubscriberRegistry::new()),
        }
    }
}
