/// Opaque key correlating a submission, its status record and any number
/// of stream subscribers.
pub type JobId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
