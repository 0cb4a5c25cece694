//! Process-local stores, used when no database is configured and in tests.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use docgen_core::params::RenderParameters;
use tokio::sync::RwLock;

use super::{PayloadArchive, RegenerationRecord, StoreError, StoredSubmission, SubmissionStore};

/// Jobs remembered by [`InMemorySubmissionStore::new`].
pub const DEFAULT_JOB_CAPACITY: usize = 10_000;

/// Regeneration entries kept per job; older ones are dropped first.
const MAX_HISTORY_PER_JOB: usize = 50;

/// Submissions and regeneration history held in process memory.
///
/// Bounded: once more than `capacity` distinct jobs are known, the job seen
/// least recently for the first time is forgotten along with its history.
/// Retry of a forgotten job falls back to the payload archive.
pub struct InMemorySubmissionStore {
    capacity: usize,
    inner: RwLock<Jobs>,
}

#[derive(Default)]
struct Jobs {
    submissions: HashMap<String, StoredSubmission>,
    history: HashMap<String, VecDeque<RegenerationRecord>>,
    /// Every known job id, oldest first.
    order: VecDeque<String>,
}

impl Jobs {
    /// Register `job_id` if new, evicting the oldest jobs beyond `capacity`.
    fn touch(&mut self, job_id: &str, capacity: usize) {
        if self.submissions.contains_key(job_id) || self.history.contains_key(job_id) {
            return;
        }
        self.order.push_back(job_id.to_string());
        while self.order.len() > capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.submissions.remove(&oldest);
            self.history.remove(&oldest);
            tracing::debug!(job_id = %oldest, "Evicted job from in-memory submission store");
        }
    }
}

impl Default for InMemorySubmissionStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_JOB_CAPACITY)
    }
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: RwLock::new(Jobs::default()),
        }
    }
}

#[async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn save(&self, submission: &StoredSubmission) -> Result<(), StoreError> {
        let mut jobs = self.inner.write().await;
        jobs.touch(&submission.job_id, self.capacity);
        jobs.submissions
            .insert(submission.job_id.clone(), submission.clone());
        Ok(())
    }

    async fn find(&self, job_id: &str) -> Result<Option<StoredSubmission>, StoreError> {
        Ok(self.inner.read().await.submissions.get(job_id).cloned())
    }

    async fn update_parameters(
        &self,
        job_id: &str,
        parameters: &RenderParameters,
    ) -> Result<bool, StoreError> {
        let value = serde_json::to_value(parameters)?;
        match self.inner.write().await.submissions.get_mut(job_id) {
            Some(submission) => {
                submission.requested_parameters = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_regeneration(
        &self,
        job_id: &str,
        parameters: &RenderParameters,
    ) -> Result<(), StoreError> {
        let entry = RegenerationRecord {
            job_id: job_id.to_string(),
            requested_parameters: serde_json::to_value(parameters)?,
            requested_at: Utc::now(),
        };

        let mut jobs = self.inner.write().await;
        jobs.touch(job_id, self.capacity);
        let entries = jobs.history.entry(job_id.to_string()).or_default();
        entries.push_back(entry);
        if entries.len() > MAX_HISTORY_PER_JOB {
            entries.pop_front();
        }
        Ok(())
    }

    async fn regeneration_history(
        &self,
        job_id: &str,
    ) -> Result<Vec<RegenerationRecord>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .history
            .get(job_id)
            .map(|entries| entries.iter().rev().cloned().collect())
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryPayloadArchive {
    documents: RwLock<HashMap<String, StoredSubmission>>,
}

impl InMemoryPayloadArchive {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PayloadArchive for InMemoryPayloadArchive {
    async fn put(&self, submission: &StoredSubmission) -> Result<(), StoreError> {
        self.documents
            .write()
            .await
            .insert(submission.job_id.clone(), submission.clone());
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<StoredSubmission>, StoreError> {
        Ok(self.documents.read().await.get(job_id).cloned())
    }
}
