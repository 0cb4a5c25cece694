//! Job orchestration for document generation.
//!
//! - [`StatusStore`]: in-memory, expiring job status records.
//! - [`ProgressPoller`]: folds render sub-progress into the store.
//! - [`PipelineInvoker`]: owns one job's render call from start to
//!   terminal status.
//! - [`RetryOrchestrator`]: re-runs a job from its stored payload.
//! - [`stores`]: where original payloads are kept for regeneration.
//!
//! The poller and the stream broadcaster never talk to each other; they
//! only share the status record.

pub mod config;
pub mod invoker;
pub mod poller;
pub mod retry;
pub mod store;
pub mod stores;

pub use config::PipelineConfig;
pub use invoker::{InvocationResult, InvokeOptions, PipelineInvoker};
pub use poller::ProgressPoller;
pub use retry::RetryOrchestrator;
pub use store::StatusStore;
