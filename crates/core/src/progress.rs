//! Coarse progress values and the sub-progress merge formula.

/// Progress shown while the submission is being saved.
pub const PROGRESS_SAVING_FORM: u8 = 5;

/// Progress shown once the pipeline has started.
pub const PROGRESS_PIPELINE_STARTED: u8 = 10;

/// Sub-progress never pushes a job past this value; only the outer
/// render call reaching success moves it to 100.
pub const SUB_PROGRESS_CEILING: u8 = 90;

/// Progress of a job that finished.
pub const PROGRESS_COMPLETE: u8 = 100;

/// Map a `completed / total` document count onto the coarse progress scale.
///
/// The result is `base + fraction * (ceiling - base)`, clamped to
/// [`SUB_PROGRESS_CEILING`]. A `total` of zero means the render service
/// does not report sub-progress, and `base` is returned unchanged.
pub fn derive_progress(base: u8, completed: u32, total: u32) -> u8 {
    if total == 0 {
        return base.min(SUB_PROGRESS_CEILING);
    }

    let fraction = f64::from(completed.min(total)) / f64::from(total);
    let budget = f64::from(SUB_PROGRESS_CEILING.saturating_sub(base));
    let value = f64::from(base) + fraction * budget;

    (value.floor() as u8).min(SUB_PROGRESS_CEILING)
}
