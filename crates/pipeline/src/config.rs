use std::str::FromStr;
use std::time::Duration;

use docgen_render::backoff::BackoffConfig;

/// Tuning of the render pipeline, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// When false every job is recorded as `skipped` without contacting
    /// the render service.
    pub enabled: bool,
    /// Default failure policy: record the failure and return normally
    /// instead of returning an error to the caller.
    pub continue_on_failure: bool,
    /// Pause between writing `processing` and issuing the render call, so a
    /// stream subscriber that is still connecting sees the initial state.
    pub start_delay: Duration,
    /// Base URL of the render/normalize service.
    pub render_service_url: String,
    /// Hard deadline for one render call.
    pub render_timeout: Duration,
    /// Total render attempts on connection failures (1 = no retry).
    pub render_max_attempts: u32,
    pub backoff: BackoffConfig,
    /// Period of the sub-progress poller.
    pub poll_interval: Duration,
    /// Deadline of one sub-progress query.
    pub poll_timeout: Duration,
    /// Externally reachable base URL, used for links in notifications.
    pub public_base_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            continue_on_failure: true,
            start_delay: Duration::from_millis(500),
            render_service_url: "http://localhost:8090".into(),
            render_timeout: Duration::from_secs(600),
            render_max_attempts: 1,
            backoff: BackoffConfig::default(),
            poll_interval: Duration::from_millis(2000),
            poll_timeout: Duration::from_millis(1500),
            public_base_url: "http://localhost:3000".into(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                 |
    /// |--------------------------------|-------------------------|
    /// | `PIPELINE_ENABLED`             | `true`                  |
    /// | `PIPELINE_CONTINUE_ON_FAILURE` | `true`                  |
    /// | `PIPELINE_START_DELAY_MS`      | `500`                   |
    /// | `RENDER_SERVICE_URL`           | `http://localhost:8090` |
    /// | `RENDER_TIMEOUT_SECS`          | `600`                   |
    /// | `RENDER_MAX_ATTEMPTS`          | `1`                     |
    /// | `PROGRESS_POLL_INTERVAL_MS`    | `2000`                  |
    /// | `PROGRESS_POLL_TIMEOUT_MS`     | `1500`                  |
    /// | `PUBLIC_BASE_URL`              | `http://localhost:3000` |
    ///
    /// Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            enabled: env_or("PIPELINE_ENABLED", defaults.enabled),
            continue_on_failure: env_or(
                "PIPELINE_CONTINUE_ON_FAILURE",
                defaults.continue_on_failure,
            ),
            start_delay: Duration::from_millis(env_or("PIPELINE_START_DELAY_MS", 500)),
            render_service_url: std::env::var("RENDER_SERVICE_URL")
                .unwrap_or(defaults.render_service_url),
            render_timeout: Duration::from_secs(env_or("RENDER_TIMEOUT_SECS", 600)),
            render_max_attempts: env_or("RENDER_MAX_ATTEMPTS", defaults.render_max_attempts)
                .max(1),
            backoff: defaults.backoff,
            poll_interval: Duration::from_millis(env_or("PROGRESS_POLL_INTERVAL_MS", 2000)),
            poll_timeout: Duration::from_millis(env_or("PROGRESS_POLL_TIMEOUT_MS", 1500)),
            public_base_url: std::env::var("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
        }
    }
}

/// Read and parse an environment variable, falling back to `default`.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring unparseable environment variable");
                default
            }
        },
        Err(_) => default,
    }
}
