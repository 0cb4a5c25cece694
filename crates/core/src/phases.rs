//! Well-known phase labels written into `JobStatusRecord::phase`.
//!
//! Clients key their UI on these strings, so they must stay stable.

/// The submission is being persisted before the pipeline starts.
pub const PHASE_SAVING_FORM: &str = "saving_form";

/// The invoker has taken ownership of the job.
pub const PHASE_PIPELINE_STARTED: &str = "pipeline_started";

/// The render service reports per-document progress.
pub const PHASE_RENDERING: &str = "rendering_documents";

/// The render service finished successfully.
pub const PHASE_COMPLETE: &str = "complete";

/// The render call failed (rejected or unreachable).
pub const PHASE_FAILED: &str = "failed";

/// Generation is administratively disabled.
pub const PHASE_SKIPPED: &str = "skipped";
