use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{archive_file_name, PayloadArchive, StoreError, StoredSubmission};

/// [`PayloadArchive`] writing one JSON document per job into a directory.
#[derive(Debug, Clone)]
pub struct LocalPayloadArchive {
    dir: PathBuf,
}

impl LocalPayloadArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, job_id: &str) -> PathBuf {
        self.dir.join(archive_file_name(job_id))
    }
}

#[async_trait]
impl PayloadArchive for LocalPayloadArchive {
    async fn put(&self, submission: &StoredSubmission) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let bytes = serde_json::to_vec_pretty(submission)?;
        tokio::fs::write(self.path_for(&submission.job_id), bytes).await?;
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<StoredSubmission>, StoreError> {
        let bytes = match tokio::fs::read(self.path_for(job_id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}
