use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use docgen_events::{NotificationDispatcher, SuccessHook};
use docgen_pipeline::stores::{
    InMemorySubmissionStore, LocalPayloadArchive, PayloadArchive, PgSubmissionStore,
    SubmissionStore,
};
use docgen_pipeline::{PipelineConfig, PipelineInvoker, StatusStore};
use docgen_render::RenderApi;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docgen_api::background;
use docgen_api::config::ServerConfig;
use docgen_api::router::build_app_router;
use docgen_api::state::AppState;
use docgen_api::stream::SubscriberRegistry;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "docgen_api=debug,docgen_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let pipeline_config = PipelineConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        pipeline_enabled = pipeline_config.enabled,
        render_service = %pipeline_config.render_service_url,
        "Loaded server configuration",
    );

    // --- Submission store ---
    let (pool, submissions) = match &config.database_url {
        Some(database_url) => {
            let pool = docgen_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            docgen_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            docgen_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            let store: Arc<dyn SubmissionStore> = Arc::new(PgSubmissionStore::new(pool.clone()));
            (Some(pool), store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, keeping submissions in memory");
            let store: Arc<dyn SubmissionStore> = Arc::new(InMemorySubmissionStore::new());
            (None, store)
        }
    };

    let archive: Arc<dyn PayloadArchive> =
        Arc::new(LocalPayloadArchive::new(&config.payload_archive_dir));
    tracing::info!(dir = %config.payload_archive_dir, "Payload archive ready");

    // --- Pipeline ---
    let status_store = Arc::new(StatusStore::new(config.status_ttl));
    let backend = Arc::new(RenderApi::new(pipeline_config.render_service_url.clone()));
    let mut invoker = PipelineInvoker::new(Arc::clone(&status_store), backend, pipeline_config);

    let dispatcher = NotificationDispatcher::from_env();
    if dispatcher.is_empty() {
        tracing::info!("No notification channel configured");
    } else {
        let hook: Arc<dyn SuccessHook> = Arc::new(dispatcher);
        invoker = invoker.with_hook(hook);
        tracing::info!("Success notifications enabled");
    }

    // --- App state ---
    let state = AppState::new(
        config.clone(),
        pool,
        Arc::new(invoker),
        submissions,
        archive,
    );
    let subscribers = Arc::clone(&state.subscribers);

    // --- Status sweep ---
    let sweep_cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn(background::status_sweep::run(
        Arc::clone(&status_store),
        config.status_sweep_interval,
        sweep_cancel.clone(),
    ));

    // --- Router ---
    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&subscribers)))
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweep_cancel.cancel();
    let _ = tokio::time::timeout(
        Duration::from_secs(config.shutdown_timeout_secs),
        sweep_handle,
    )
    .await;
    tracing::info!("Status sweep stopped");

    let tracked_jobs = status_store.len().await;
    tracing::info!(
        tracked_jobs,
        "Graceful shutdown complete, in-flight job status is discarded"
    );
}

/// Wait for a termination signal, then end every push stream.
///
/// Streams never finish on their own while a job runs, so they are
/// cancelled here; otherwise graceful shutdown would wait on them.
async fn shutdown_signal(subscribers: Arc<SubscriberRegistry>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }

    let open = subscribers.connection_count().await;
    tracing::info!(open, "Closing push streams");
    subscribers.shutdown_all().await;
}
