//! Domain types for the document-generation job engine.
//!
//! Everything here is pure data and arithmetic: status records and their
//! transitions, phase labels, sub-progress math, validated render
//! parameters and the error kinds shared by every other crate.

pub mod error;
pub mod job_status;
pub mod params;
pub mod phases;
pub mod progress;
pub mod types;
