pub mod regeneration;
pub mod submission;
