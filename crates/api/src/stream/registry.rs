use std::collections::HashMap;

use docgen_core::types::Timestamp;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Metadata for a single push-stream connection.
pub struct StreamConnection {
    /// Job the connection is watching.
    pub job_id: String,
    /// Cancelled to end the connection from the server side.
    pub cancel: CancellationToken,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Tracks every open push-stream connection.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct SubscriberRegistry {
    connections: RwLock<HashMap<String, StreamConnection>>,
    /// Parent of every connection token; cancelled on shutdown so that
    /// connections opened during shutdown end immediately too.
    shutdown: CancellationToken,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Register a connection for `job_id`.
    ///
    /// Returns the connection id and the token the connection must watch.
    pub async fn register(&self, job_id: &str) -> (String, CancellationToken) {
        let conn_id = uuid::Uuid::new_v4().to_string();
        let cancel = self.shutdown.child_token();
        let conn = StreamConnection {
            job_id: job_id.to_string(),
            cancel: cancel.clone(),
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id.clone(), conn);
        (conn_id, cancel)
    }

    /// Remove a connection by its ID.
    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Return the current number of open connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Number of open connections watching `job_id`.
    pub async fn count_for_job(&self, job_id: &str) -> usize {
        self.connections
            .read()
            .await
            .values()
            .filter(|conn| conn.job_id == job_id)
            .count()
    }

    /// Cancel every connection, then clear the map.
    ///
    /// Clients see their stream end and reconnect (to another instance, or
    /// to this one once it is back).
    pub async fn shutdown_all(&self) {
        self.shutdown.cancel();
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            conn.cancel.cancel();
        }
        conns.clear();
        tracing::info!(count, "Closed all push-stream connections");
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
