//! Client side of the external document render/normalize service.
//!
//! [`RenderBackend`] is the seam the pipeline talks to; [`RenderApi`] is
//! the HTTP implementation. [`backoff`] holds the delay schedule used when
//! a transport-level failure is retried.

pub mod api;
pub mod backend;
pub mod backoff;

pub use api::{RenderApi, RenderApiError};
pub use backend::{RenderBackend, RenderError, RenderRequest};
