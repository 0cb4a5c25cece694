//! In-memory job status records with per-entry expiry.
//!
//! [`StatusStore`] is constructed once at startup and shared via `Arc`.
//! Every write re-stamps `expires_at = now + ttl`; reads treat expired
//! entries as absent even before [`StatusStore::sweep`] removes them.
//!
//! Records are tagged with an `attempt` number. Writes from an older
//! attempt are discarded, and within one attempt the status only moves
//! forward, so a late write can never resurrect a finished job.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use docgen_core::job_status::JobStatusRecord;
use tokio::sync::RwLock;

/// Default lifetime of a record after its last write: long enough to
/// outlast the slowest render plus a client's polling delay.
pub const DEFAULT_STATUS_TTL: Duration = Duration::from_secs(15 * 60);

/// Shared, expiring map from job id to its latest status record.
pub struct StatusStore {
    entries: RwLock<HashMap<String, JobStatusRecord>>,
    ttl: chrono::Duration,
}

impl StatusStore {
    /// Create an empty store whose entries live for `ttl` after each write.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(1)),
        }
    }

    /// Upsert a record, stamping a fresh `expires_at`.
    ///
    /// Returns `false` (and leaves the stored record untouched) when the
    /// write belongs to an older attempt, or would move the current attempt
    /// backwards (e.g. `success -> processing`).
    pub async fn set(&self, mut record: JobStatusRecord) -> bool {
        let now = Utc::now();
        let mut entries = self.entries.write().await;

        if let Some(current) = entries.get(&record.job_id) {
            if current.expires_at > now && !accepts(current, &record) {
                tracing::debug!(
                    job_id = %record.job_id,
                    current_status = current.status.as_str(),
                    rejected_status = record.status.as_str(),
                    current_attempt = current.attempt,
                    rejected_attempt = record.attempt,
                    "Discarding out-of-order status write",
                );
                return false;
            }
        }

        record.expires_at = now + self.ttl;
        entries.insert(record.job_id.clone(), record);
        true
    }

    /// Start a new attempt for `record.job_id`, superseding whatever is
    /// stored (including a terminal record).
    ///
    /// The attempt number is assigned atomically: one more than the stored
    /// record's, or 1 if there is none. Returns the record as stored.
    pub async fn begin_attempt(&self, mut record: JobStatusRecord) -> JobStatusRecord {
        let now = Utc::now();
        let mut entries = self.entries.write().await;

        record.attempt = entries
            .get(&record.job_id)
            .map(|current| current.attempt + 1)
            .unwrap_or(1);
        record.expires_at = now + self.ttl;
        entries.insert(record.job_id.clone(), record.clone());
        record
    }

    /// Read-merge-write on a live, non-terminal record of `attempt`.
    ///
    /// `merge` runs under the write lock, so no other writer can interleave.
    /// Returns `false` without calling `merge` when the record is missing,
    /// expired, already terminal, or belongs to another attempt.
    pub async fn update<F>(&self, job_id: &str, attempt: u32, merge: F) -> bool
    where
        F: FnOnce(&mut JobStatusRecord),
    {
        let now = Utc::now();
        let mut entries = self.entries.write().await;

        match entries.get_mut(job_id) {
            Some(record)
                if record.expires_at > now
                    && record.attempt == attempt
                    && !record.is_terminal() =>
            {
                merge(record);
                record.expires_at = now + self.ttl;
                true
            }
            _ => false,
        }
    }

    /// Current record for `job_id`, or `None` if never set or expired.
    pub async fn get(&self, job_id: &str) -> Option<JobStatusRecord> {
        let now = Utc::now();
        self.entries
            .read()
            .await
            .get(job_id)
            .filter(|record| record.expires_at > now)
            .cloned()
    }

    /// Remove every expired entry. Returns how many were evicted.
    pub async fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, record| record.expires_at > now);
        before - entries.len()
    }

    /// Number of live (non-expired) records.
    pub async fn len(&self) -> usize {
        let now = Utc::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|record| record.expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_TTL)
    }
}

/// Whether `next` may replace `current`.
fn accepts(current: &JobStatusRecord, next: &JobStatusRecord) -> bool {
    use std::cmp::Ordering;

    match next.attempt.cmp(&current.attempt) {
        Ordering::Less => false,
        Ordering::Equal => current.status.can_transition_to(next.status),
        // A newer attempt must go through `begin_attempt`; a plain `set`
        // may still not regress a finished job.
        Ordering::Greater => !current.is_terminal() || next.is_terminal(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
