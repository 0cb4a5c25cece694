//! The push-stream endpoint: one task per connection mirroring the status
//! store into SSE frames.
//!
//! The task and the response body are joined by a bounded channel. The task
//! ends (and with it the body) when the terminal frame has been sent and
//! the close grace has passed, when the client goes away, or when the
//! registry cancels the connection on shutdown.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::CACHE_CONTROL;
use axum::http::HeaderName;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use docgen_pipeline::StatusStore;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use super::view::{Frame, SubscriberView};
use crate::config::StreamSettings;
use crate::state::AppState;

/// Frames buffered per connection before the task waits for the client.
const CHANNEL_CAPACITY: usize = 16;

type EventSender = mpsc::Sender<Result<Event, Infallible>>;

/// GET /api/v1/jobs/{job_id}/stream
///
/// Events emitted:
/// - `open`     -- connection acknowledged
/// - `progress` -- non-terminal snapshot, only when it changed
/// - `complete` -- `success`/`skipped` snapshot, or `status: not_found`
/// - `error`    -- `failed` snapshot with the error message and kind
///
/// Comment frames are sent periodically as a heartbeat.
pub async fn stream_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (conn_id, cancel) = state.subscribers.register(&job_id).await;

    tracing::info!(job_id = %job_id, conn_id = %conn_id, "Push stream connected");

    let store = Arc::clone(&state.status_store);
    let subscribers = Arc::clone(&state.subscribers);
    let settings = state.config.stream;
    tokio::spawn(async move {
        serve_subscriber(&store, &job_id, settings, &tx, &cancel).await;
        subscribers.remove(&conn_id).await;
        tracing::info!(job_id = %job_id, conn_id = %conn_id, "Push stream closed");
    });

    (
        [
            (CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(ReceiverStream::new(rx)),
    )
}

/// Drive one connection until it is finished. Returns when the stream
/// should be closed.
async fn serve_subscriber(
    store: &StatusStore,
    job_id: &str,
    settings: StreamSettings,
    tx: &EventSender,
    cancel: &CancellationToken,
) {
    let mut view = SubscriberView::new(job_id);

    let snapshot = store.get(job_id).await;
    if snapshot.is_some() && !send(tx, Frame::Open { job_id: job_id.to_string() }).await {
        return;
    }
    // Missing record: this emits the not-found terminal frame right away.
    if let Some(frame) = view.observe(snapshot.as_ref()) {
        if !send(tx, frame).await {
            return;
        }
    }
    if view.is_finished() {
        close_after_grace(settings, tx, cancel).await;
        return;
    }

    let start = Instant::now();
    let mut poll = interval_at(start + settings.poll_interval, settings.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut heartbeat = interval_at(
        start + settings.heartbeat_interval,
        settings.heartbeat_interval,
    );
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(job_id, "Push stream cancelled");
                return;
            }
            _ = tx.closed() => {
                tracing::debug!(job_id, "Push stream client disconnected");
                return;
            }
            _ = poll.tick() => {
                let snapshot = store.get(job_id).await;
                if let Some(frame) = view.observe(snapshot.as_ref()) {
                    if !send(tx, frame).await {
                        return;
                    }
                }
                if view.is_finished() {
                    close_after_grace(settings, tx, cancel).await;
                    return;
                }
            }
            _ = heartbeat.tick() => {
                if tx.send(Ok(Event::default().comment("heartbeat"))).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Returns `false` once the client is gone.
async fn send(tx: &EventSender, frame: Frame) -> bool {
    tx.send(Ok(frame.into_event())).await.is_ok()
}

/// Keep the stream open briefly so the final frame is flushed before the
/// body ends.
async fn close_after_grace(settings: StreamSettings, tx: &EventSender, cancel: &CancellationToken) {
    tokio::select! {
        _ = tokio::time::sleep(settings.close_grace) => {}
        _ = tx.closed() => {}
        _ = cancel.cancelled() => {}
    }
}

