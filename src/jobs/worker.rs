//! Worker: the polling dispatch loop
//!
//! The worker claims queued job ids, loads each record, and dispatches on
//! the job kind: a page audit is a single fetch+analyze call; a site audit
//! drives a [`SiteCrawler`]. Every handler error is caught per job and
//! turned into `status=Failed` — one bad job never aborts the loop or
//! affects its neighbors. On success the result is persisted and written
//! to the cache fire-and-forget, stamped with the job's completion time.

use crate::analyzer::{Analyzer, BasicAnalyzer, PageAnalysis};
use crate::cache::{fingerprint_options, CacheLayer};
use crate::config::Config;
use crate::crawler::{Fetcher, SiteCrawler};
use crate::jobs::{
    AuditOptions, AuditReport, JobKind, JobPatch, JobStatus, JobStore, PageAuditReport,
    SiteAuditReport,
};
use crate::store::SharedStore;
use crate::url::normalize_url;
use crate::AuditError;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Background job processor
///
/// Holds its dependencies explicitly; nothing here is a singleton. The
/// store is the only resource shared with other workers or the service.
pub struct Worker {
    jobs: JobStore,
    cache: CacheLayer,
    fetcher: Arc<Fetcher>,
    analyzer: Arc<dyn Analyzer>,
    config: Arc<Config>,
    shutdown: Arc<AtomicBool>,
}

impl Worker {
    /// Creates a worker with the built-in analyzer
    pub fn new(store: SharedStore, config: Arc<Config>) -> crate::Result<Self> {
        let fetcher = Arc::new(Fetcher::new(&config.fetcher, &config.user_agent)?);
        // The analyzer shares the fetcher's client so the whole pipeline
        // presents one identity
        let analyzer: Arc<dyn Analyzer> = Arc::new(BasicAnalyzer::new(fetcher.client().clone()));
        Ok(Self {
            jobs: JobStore::new(Arc::clone(&store)),
            cache: CacheLayer::new(store, &config.cache),
            fetcher,
            analyzer,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Creates a worker with a specific analyzer implementation
    pub fn with_analyzer(
        store: SharedStore,
        config: Arc<Config>,
        analyzer: Arc<dyn Analyzer>,
    ) -> crate::Result<Self> {
        let fetcher = Arc::new(Fetcher::new(&config.fetcher, &config.user_agent)?);
        Ok(Self {
            jobs: JobStore::new(Arc::clone(&store)),
            cache: CacheLayer::new(store, &config.cache),
            fetcher,
            analyzer,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Handle for requesting a graceful shutdown
    ///
    /// The flag is observed between jobs and, inside a site crawl, between
    /// batches.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Runs the polling loop until shutdown is requested
    pub async fn run(&self) {
        let poll_interval = Duration::from_millis(self.config.service.poll_interval_ms);
        tracing::info!(
            "Worker starting (poll interval {:?}, batch size {})",
            poll_interval,
            self.config.service.batch_size
        );

        loop {
            if self.is_shutdown_requested() {
                break;
            }

            match self.run_batch(self.config.service.batch_size).await {
                Ok(0) => tokio::time::sleep(poll_interval).await,
                Ok(_) => {}
                Err(e) => {
                    // Queue polling failed; the store may be down. Back off
                    // and keep trying rather than crash.
                    tracing::error!("Queue poll failed: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        tracing::info!("Worker stopped");
    }

    /// Processes up to `max` queued jobs and returns how many ran
    ///
    /// Idempotent single-batch execution: callers may invoke this from a
    /// scheduler instead of running the long-lived loop.
    pub async fn run_batch(&self, max: usize) -> crate::Result<usize> {
        let mut processed = 0;

        for _ in 0..max {
            if self.is_shutdown_requested() {
                break;
            }

            let id = match self.jobs.dequeue_next()? {
                Some(id) => id,
                None => break,
            };

            self.process_job(id).await;
            processed += 1;
        }

        Ok(processed)
    }

    /// Runs one claimed job to completion
    ///
    /// Never returns an error: handler failures become `status=Failed` on
    /// the record, and store hiccups while recording status are logged.
    async fn process_job(&self, id: Uuid) {
        let job = match self.jobs.get_job(&id) {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::warn!("Dequeued job {} has no record, skipping", id);
                return;
            }
            Err(e) => {
                tracing::error!("Failed to load job {}: {}", id, e);
                return;
            }
        };

        tracing::info!("Processing {} job {} for {}", job.kind.name(), id, job.kind.target_url());

        // `false` here means the record vanished mid-flight; non-fatal
        if let Err(e) = self.jobs.update_job(
            &id,
            JobPatch {
                status: Some(JobStatus::Processing),
                ..Default::default()
            },
        ) {
            tracing::warn!("Failed to mark job {} processing: {}", id, e);
        }

        let outcome = match &job.kind {
            JobKind::PageAudit { url, .. } => self.run_page_audit(url).await,
            JobKind::SiteAudit { url, options } => self.run_site_audit(id, url, options).await,
        };

        match outcome {
            Ok(report) => {
                let completed_at = Utc::now();
                if let Err(e) = self.jobs.update_job(
                    &id,
                    JobPatch {
                        status: Some(JobStatus::Completed),
                        progress: Some(100),
                        completed_at: Some(completed_at),
                        results: Some(report.clone()),
                        ..Default::default()
                    },
                ) {
                    tracing::error!("Failed to record results for job {}: {}", id, e);
                }

                // Fire-and-forget cache write stamped with completion time
                if let Ok(target) = normalize_url(job.kind.target_url()) {
                    let fingerprint = fingerprint_options(job.kind.options());
                    let kind = job.kind.artifact_kind();
                    let key = self.cache.key(kind, &target, &fingerprint);
                    self.cache.write(&key, kind, &report, completed_at);
                }

                tracing::info!("Job {} completed", id);
            }
            Err(e) => {
                tracing::warn!("Job {} failed: {}", id, e);
                if let Err(update_err) = self.jobs.update_job(
                    &id,
                    JobPatch {
                        status: Some(JobStatus::Failed),
                        error: Some(e.to_string()),
                        ..Default::default()
                    },
                ) {
                    tracing::error!("Failed to mark job {} failed: {}", id, update_err);
                }
            }
        }
    }

    /// Page audit: one fetch, one analysis
    async fn run_page_audit(&self, url: &str) -> crate::Result<AuditReport> {
        let target = normalize_url(url)?;
        let page = self.fetcher.fetch(&target).await?;

        let analysis = match self.analyzer.analyze(&target, Some(&page.body)).await {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!("Analysis of {} failed: {}", target, e);
                PageAnalysis::degraded(page.status, &e.to_string())
            }
        };

        Ok(AuditReport::Page(PageAuditReport {
            url: page.final_url,
            analysis,
            fetched_bytes: page.bytes,
            fetch_ms: page.elapsed.as_millis() as u64,
        }))
    }

    /// Site audit: drive a crawl, streaming advisory progress to the record
    async fn run_site_audit(
        &self,
        id: Uuid,
        url: &str,
        options: &AuditOptions,
    ) -> crate::Result<AuditReport> {
        let seed = normalize_url(url)?;

        let ceiling = match self.config.crawler.max_crawl_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let crawler = SiteCrawler::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.analyzer),
            options.clone(),
            ceiling,
            // Worker shutdown stops the crawl at the next batch boundary
            Arc::clone(&self.shutdown),
        );

        let jobs = self.jobs.clone();
        let pages = crawler
            .crawl(&seed, move |progress| {
                // Best-effort: a missed update must never fail the crawl
                if let Err(e) = jobs.update_job(
                    &id,
                    JobPatch {
                        progress: Some(progress),
                        ..Default::default()
                    },
                ) {
                    tracing::debug!("Progress update for job {} dropped: {}", id, e);
                }
            })
            .await?;

        let report = SiteAuditReport::from_pages(seed.to_string(), pages);

        // A crawl where nothing could be fetched is a failed job, not an
        // empty success
        if report.pages_crawled == 0 {
            return Err(AuditError::NoPagesCrawled(seed.to_string()));
        }

        Ok(AuditReport::Site(report))
    }
}
