use std::time::Duration;

use docgen_pipeline::config::env_or;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// Time allowed to produce response headers, in seconds (default: `30`).
    ///
    /// Push streams are not affected once their headers are sent.
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// PostgreSQL URL. When absent, submissions are kept in memory.
    pub database_url: Option<String>,
    /// Directory of the fallback payload archive.
    pub payload_archive_dir: String,
    /// Lifetime of a status record after its last write.
    pub status_ttl: Duration,
    /// Period of the expired-record sweep.
    pub status_sweep_interval: Duration,
    pub stream: StreamSettings,
}

/// Timing of one push-stream connection.
#[derive(Debug, Clone, Copy)]
pub struct StreamSettings {
    /// How often the status store is re-read.
    pub poll_interval: Duration,
    /// How often a comment frame is sent to keep intermediaries from
    /// closing an idle connection.
    pub heartbeat_interval: Duration,
    /// Pause between the terminal event and closing the stream.
    pub close_grace: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2000),
            heartbeat_interval: Duration::from_secs(20),
            close_grace: Duration::from_millis(100),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                 |
    /// |----------------------------------|-------------------------|
    /// | `HOST`                           | `0.0.0.0`               |
    /// | `PORT`                           | `3000`                  |
    /// | `CORS_ORIGINS`                   | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`           | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`          | `30`                    |
    /// | `DATABASE_URL`                   | unset (in-memory)       |
    /// | `PAYLOAD_ARCHIVE_DIR`            | `./data/submissions`    |
    /// | `STATUS_TTL_SECS`                | `900`                   |
    /// | `STATUS_SWEEP_INTERVAL_SECS`     | `300`                   |
    /// | `STREAM_POLL_INTERVAL_MS`        | `2000`                  |
    /// | `STREAM_HEARTBEAT_INTERVAL_SECS` | `20`                    |
    /// | `STREAM_CLOSE_GRACE_MS`          | `100`                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let payload_archive_dir = std::env::var("PAYLOAD_ARCHIVE_DIR")
            .unwrap_or_else(|_| "./data/submissions".into());

        let stream = StreamSettings {
            poll_interval: Duration::from_millis(env_or("STREAM_POLL_INTERVAL_MS", 2000)),
            heartbeat_interval: Duration::from_secs(env_or("STREAM_HEARTBEAT_INTERVAL_SECS", 20)),
            close_grace: Duration::from_millis(env_or("STREAM_CLOSE_GRACE_MS", 100)),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            database_url,
            payload_archive_dir,
            status_ttl: Duration::from_secs(env_or("STATUS_TTL_SECS", 900)),
            status_sweep_interval: Duration::from_secs(env_or("STATUS_SWEEP_INTERVAL_SECS", 300)),
            stream,
        }
    }
}
