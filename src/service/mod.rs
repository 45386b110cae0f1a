//! Audit service facade
//!
//! The external-facing job API: validate a submission, try the cache first,
//! apply backlog admission control, and create the job on a miss. Status
//! and result queries read job records back out of the store. All
//! dependencies are injected; request handlers (HTTP, CLI) stay thin
//! wrappers around this type.

use crate::cache::{fingerprint_options, ArtifactKind, CacheLayer, CachedArtifact};
use crate::config::Config;
use crate::jobs::{AuditOptions, AuditReport, JobKind, JobRecord, JobStatus, JobStore};
use crate::store::SharedStore;
use crate::url::normalize_url;
use crate::AuditError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// What happened to a submission
#[derive(Debug)]
pub enum SubmitOutcome {
    /// A fresh artifact was already cached; no job was created
    Cached(CachedArtifact),
    /// A job was created and queued
    Enqueued(Uuid),
    /// The pending backlog is full; retry later
    Busy,
}

/// A job record with its large result payload stripped
///
/// This is what status queries return; results come from
/// [`AuditService::job_results`] once the job completes.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusView {
    pub id: Uuid,
    pub job_type: &'static str,
    pub target: String,
    pub status: JobStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<JobRecord> for JobStatusView {
    fn from(record: JobRecord) -> Self {
        Self {
            id: record.id,
            job_type: record.kind.name(),
            target: record.kind.target_url().to_string(),
            status: record.status,
            progress: record.progress,
            created_at: record.created_at,
            updated_at: record.updated_at,
            completed_at: record.completed_at,
            error: record.error,
        }
    }
}

/// Entry point for audit submissions and job queries
pub struct AuditService {
    jobs: JobStore,
    cache: CacheLayer,
    config: Arc<Config>,
}

impl AuditService {
    /// Creates a service over a shared store
    pub fn new(store: SharedStore, config: Arc<Config>) -> Self {
        Self {
            jobs: JobStore::new(Arc::clone(&store)),
            cache: CacheLayer::new(store, &config.cache),
            config,
        }
    }

    /// Submits an audit request
    ///
    /// Validation failures surface synchronously, before any job exists.
    /// Cache-first: a fresh artifact for the same normalized target and
    /// option fingerprint short-circuits without creating a job. Beyond
    /// the configured backlog, submissions are rejected with
    /// [`SubmitOutcome::Busy`] instead of queued.
    pub fn submit(
        &self,
        target: &str,
        kind: ArtifactKind,
        options: Option<AuditOptions>,
    ) -> crate::Result<SubmitOutcome> {
        let trimmed = target.trim();
        if trimmed.is_empty() {
            return Err(AuditError::Validation("target URL is required".to_string()));
        }

        let normalized =
            normalize_url(trimmed).map_err(|e| AuditError::Validation(e.to_string()))?;

        let options =
            options.unwrap_or_else(|| AuditOptions::from_config(&self.config.crawler));
        let fingerprint = fingerprint_options(&options);
        let key = self.cache.key(kind, &normalized, &fingerprint);

        if let Some(hit) = self.cache.read(&key) {
            tracing::info!("Serving {} for {} from cache", kind.as_str(), normalized);
            return Ok(SubmitOutcome::Cached(hit));
        }

        if self.jobs.queue_len()? >= self.config.service.max_backlog {
            tracing::warn!(
                "Rejecting submission for {}: backlog at {} jobs",
                normalized,
                self.config.service.max_backlog
            );
            return Ok(SubmitOutcome::Busy);
        }

        let job_kind = match kind {
            ArtifactKind::PageAudit => JobKind::PageAudit {
                url: normalized.to_string(),
                options,
            },
            ArtifactKind::SiteAudit => JobKind::SiteAudit {
                url: normalized.to_string(),
                options,
            },
        };

        let id = self.jobs.create_job(job_kind)?;
        Ok(SubmitOutcome::Enqueued(id))
    }

    /// Returns a job's record minus its result payload
    pub fn job_status(&self, id: &Uuid) -> crate::Result<JobStatusView> {
        match self.jobs.get_job(id)? {
            Some(record) => Ok(record.into()),
            None => Err(AuditError::JobNotFound(*id)),
        }
    }

    /// Returns a completed job's final artifact
    ///
    /// Errors when the job does not exist, has failed, or has not finished
    /// yet.
    pub fn job_results(&self, id: &Uuid) -> crate::Result<AuditReport> {
        let record = self
            .jobs
            .get_job(id)?
            .ok_or(AuditError::JobNotFound(*id))?;

        match record.status {
            JobStatus::Completed => record
                .results
                .ok_or(AuditError::JobNotCompleted(*id)),
            JobStatus::Failed => Err(AuditError::JobFailed {
                id: *id,
                message: record.error.unwrap_or_else(|| "unknown error".to_string()),
            }),
            JobStatus::Queued | JobStatus::Processing => {
                Err(AuditError::JobNotCompleted(*id))
            }
        }
    }

    /// Current pending-queue depth, for admission control and operators
    pub fn queue_len(&self) -> crate::Result<usize> {
        Ok(self.jobs.queue_len()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use std::sync::Mutex;

    fn test_service(max_backlog: usize) -> AuditService {
        let mut config = Config::default();
        config.service.max_backlog = max_backlog;
        let store: SharedStore = Arc::new(Mutex::new(SqliteStore::new_in_memory().unwrap()));
        AuditService::new(store, Arc::new(config))
    }

    #[test]
    fn test_empty_target_rejected_synchronously() {
        let service = test_service(10);
        let result = service.submit("   ", ArtifactKind::PageAudit, None);
        assert!(matches!(result, Err(AuditError::Validation(_))));
        assert_eq!(service.queue_len().unwrap(), 0);
    }

    #[test]
    fn test_malformed_target_rejected() {
        let service = test_service(10);
        let result = service.submit("not a url", ArtifactKind::PageAudit, None);
        assert!(matches!(result, Err(AuditError::Validation(_))));
    }

    #[test]
    fn test_submission_enqueues_job() {
        let service = test_service(10);
        let outcome = service
            .submit("https://example.com/", ArtifactKind::SiteAudit, None)
            .unwrap();

        let id = match outcome {
            SubmitOutcome::Enqueued(id) => id,
            other => panic!("expected Enqueued, got {:?}", other),
        };

        let status = service.job_status(&id).unwrap();
        assert_eq!(status.status, JobStatus::Queued);
        assert_eq!(status.progress, 0);
        assert_eq!(status.job_type, "site_audit");
        assert_eq!(status.target, "https://example.com/");
    }

    #[test]
    fn test_backlog_rejects_with_busy() {
        let service = test_service(1);
        let first = service
            .submit("https://example.com/a", ArtifactKind::PageAudit, None)
            .unwrap();
        assert!(matches!(first, SubmitOutcome::Enqueued(_)));

        let second = service
            .submit("https://example.com/b", ArtifactKind::PageAudit, None)
            .unwrap();
        assert!(matches!(second, SubmitOutcome::Busy));
    }

    #[test]
    fn test_status_of_unknown_job() {
        let service = test_service(10);
        let result = service.job_status(&Uuid::new_v4());
        assert!(matches!(result, Err(AuditError::JobNotFound(_))));
    }

    #[test]
    fn test_results_before_completion() {
        let service = test_service(10);
        let outcome = service
            .submit("https://example.com/", ArtifactKind::PageAudit, None)
            .unwrap();
        let SubmitOutcome::Enqueued(id) = outcome else {
            panic!("expected Enqueued");
        };

        let result = service.job_results(&id);
        assert!(matches!(result, Err(AuditError::JobNotCompleted(_))));
    }
}
