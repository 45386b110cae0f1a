//! Job records and audit report payloads
//!
//! Jobs are typed end to end: the kind is a tagged union discriminated at
//! dispatch time, and each kind carries its own strongly-typed params and
//! result payload. Records serialize to JSON in the store under
//! `job:<id>`.

use crate::analyzer::PageAnalysis;
use crate::cache::ArtifactKind;
use crate::config::CrawlerConfig;
use crate::crawler::PageRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

/// Options controlling one audit
///
/// Fields left unset at submission are filled from the crawler section of
/// the service configuration. Options participate in the cache key via
/// their fingerprint, so the same target under different settings gets
/// distinct cache entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditOptions {
    /// Maximum number of pages crawled per site audit
    pub max_pages: usize,
    /// Maximum link depth from the seed URL
    pub max_depth: u32,
    /// Pages fetched in parallel within one crawl batch
    pub concurrency: usize,
    /// Minimum spacing between requests to the same domain (milliseconds)
    pub throttle_ms: u64,
    /// Whether the crawl honors robots.txt
    pub respect_robots: bool,
    /// Whether subdomains of the seed host count as in-site
    pub include_subdomains: bool,
}

impl AuditOptions {
    /// Builds options from the configured crawl defaults
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            max_depth: config.max_depth,
            concurrency: config.concurrency,
            throttle_ms: config.throttle_ms,
            respect_robots: config.respect_robots,
            include_subdomains: config.include_subdomains,
        }
    }
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// What a job does, with its typed parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobKind {
    /// Audit a single page
    PageAudit { url: String, options: AuditOptions },
    /// Crawl and audit a whole site within page/depth budgets
    SiteAudit { url: String, options: AuditOptions },
}

impl JobKind {
    /// The audit's target URL
    pub fn target_url(&self) -> &str {
        match self {
            Self::PageAudit { url, .. } | Self::SiteAudit { url, .. } => url,
        }
    }

    /// The options the audit runs under
    pub fn options(&self) -> &AuditOptions {
        match self {
            Self::PageAudit { options, .. } | Self::SiteAudit { options, .. } => options,
        }
    }

    /// The cache artifact kind this job produces
    pub fn artifact_kind(&self) -> ArtifactKind {
        match self {
            Self::PageAudit { .. } => ArtifactKind::PageAudit,
            Self::SiteAudit { .. } => ArtifactKind::SiteAudit,
        }
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::PageAudit { .. } => "page_audit",
            Self::SiteAudit { .. } => "site_audit",
        }
    }
}

/// Result of a single-page audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageAuditReport {
    pub url: String,
    pub analysis: PageAnalysis,
    pub fetched_bytes: usize,
    pub fetch_ms: u64,
}

/// Result of a whole-site audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteAuditReport {
    pub seed_url: String,
    pub pages_crawled: usize,
    pub pages_failed: usize,
    /// Mean score across successfully analyzed pages, 0 when none
    pub average_score: u8,
    /// All page records, in batch-dispatch order
    pub pages: Vec<PageRecord>,
}

impl SiteAuditReport {
    /// Aggregates the crawl's page records into a site report
    pub fn from_pages(seed_url: String, pages: Vec<PageRecord>) -> Self {
        let mut crawled = 0usize;
        let mut failed = 0usize;
        let mut score_sum = 0u32;

        for page in &pages {
            match page.status {
                crate::crawler::PageStatus::Crawled => {
                    crawled += 1;
                    if let Some(ref analysis) = page.analysis {
                        score_sum += u32::from(analysis.score);
                    }
                }
                crate::crawler::PageStatus::Failed => failed += 1,
            }
        }

        let average_score = if crawled > 0 {
            (score_sum / crawled as u32) as u8
        } else {
            0
        };

        Self {
            seed_url,
            pages_crawled: crawled,
            pages_failed: failed,
            average_score,
            pages,
        }
    }
}

/// Final artifact of a completed job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "artifact", rename_all = "snake_case")]
pub enum AuditReport {
    Page(PageAuditReport),
    Site(SiteAuditReport),
}

/// Persisted job record
///
/// Owned exclusively by the worker once dequeued; mutated only through
/// [`JobStore::update_job`](crate::jobs::JobStore::update_job). The
/// pipeline never deletes records; expiry is a store-level concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    /// 0-100, monotonically non-decreasing while processing, advisory
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<AuditReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Partial update merged into a job record
///
/// `None` fields are left untouched. Progress merges monotonically: an
/// update can never move progress backwards.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub completed_at: Option<DateTime<Utc>>,
    pub results: Option<AuditReport>,
    pub error: Option<String>,
}
