//! Server-sent event stream of a job's status.
//!
//! - [`view`] turns status snapshots into frames (change detection,
//!   terminal-once).
//! - [`broadcaster`] runs one connection: the HTTP handler plus the
//!   polling and heartbeat loop.
//! - [`registry`] tracks open connections for health and shutdown.

pub mod broadcaster;
pub mod registry;
pub mod view;

pub use broadcaster::stream_job;
pub use registry::SubscriberRegistry;
pub use view::{Frame, SubscriberView};
