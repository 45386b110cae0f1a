//! Job persistence over the shared store
//!
//! Job records live as JSON under `job:<id>`; pending job ids flow through
//! the `jobs:pending` queue. All mutations are read-modify-write under the
//! store lock, so field merges are per-key atomic, and the dequeue rides on
//! the store's exactly-once `queue_pop`.

use crate::jobs::{JobKind, JobPatch, JobRecord, JobStatus};
use crate::store::{SharedStore, StoreError, StoreResult};
use chrono::Utc;
use uuid::Uuid;

/// Queue holding the ids of jobs waiting for a worker
pub const PENDING_QUEUE: &str = "jobs:pending";

fn job_key(id: &Uuid) -> String {
    format!("job:{}", id)
}

/// Create/read/update access to job records
#[derive(Clone)]
pub struct JobStore {
    store: SharedStore,
}

impl JobStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Creates a job and enqueues its id
    ///
    /// The record starts `Queued` at progress 0 with both timestamps set to
    /// now.
    pub fn create_job(&self, kind: JobKind) -> StoreResult<Uuid> {
        let now = Utc::now();
        let record = JobRecord {
            id: Uuid::new_v4(),
            kind,
            status: JobStatus::Queued,
            progress: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
            results: None,
            error: None,
        };

        let raw = serde_json::to_string(&record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut store = self.store.lock().unwrap();
        store.set(&job_key(&record.id), &raw, None)?;
        store.queue_push(PENDING_QUEUE, &record.id.to_string())?;

        tracing::debug!("Created {} job {}", record.kind.name(), record.id);
        Ok(record.id)
    }

    /// Loads a job record
    pub fn get_job(&self, id: &Uuid) -> StoreResult<Option<JobRecord>> {
        let raw = self.store.lock().unwrap().get(&job_key(id))?;
        match raw {
            Some(raw) => {
                let record = serde_json::from_str(&raw)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Merges a partial update into a job record
    ///
    /// Bumps `updated_at`; progress merges monotonically. Returns `false`
    /// when the id is absent — callers must treat that as non-fatal.
    pub fn update_job(&self, id: &Uuid, patch: JobPatch) -> StoreResult<bool> {
        let key = job_key(id);
        let mut store = self.store.lock().unwrap();

        let raw = match store.get(&key)? {
            Some(raw) => raw,
            None => return Ok(false),
        };

        let mut record: JobRecord = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(progress) = patch.progress {
            record.progress = record.progress.max(progress.min(100));
        }
        if let Some(completed_at) = patch.completed_at {
            record.completed_at = Some(completed_at);
        }
        if let Some(results) = patch.results {
            record.results = Some(results);
        }
        if let Some(error) = patch.error {
            record.error = Some(error);
        }
        record.updated_at = Utc::now();

        let raw = serde_json::to_string(&record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        store.set(&key, &raw, None)?;
        Ok(true)
    }

    /// Atomically claims the next queued job id
    ///
    /// A given id is returned to at most one concurrent caller. Unparseable
    /// queue entries are logged and skipped.
    pub fn dequeue_next(&self) -> StoreResult<Option<Uuid>> {
        loop {
            let value = self.store.lock().unwrap().queue_pop(PENDING_QUEUE)?;
            match value {
                Some(raw) => match raw.parse::<Uuid>() {
                    Ok(id) => return Ok(Some(id)),
                    Err(_) => {
                        tracing::warn!("Dropping malformed queue entry {:?}", raw);
                        continue;
                    }
                },
                None => return Ok(None),
            }
        }
    }

    /// Number of jobs waiting in the pending queue
    pub fn queue_len(&self) -> StoreResult<usize> {
        self.store.lock().unwrap().queue_len(PENDING_QUEUE)
    }
}
