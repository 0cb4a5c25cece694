mod regeneration_repo;
mod submission_repo;

pub use regeneration_repo::RegenerationRepo;
pub use submission_repo::SubmissionRepo;
