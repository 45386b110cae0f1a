//! Cache layer
//!
//! Cache-first wrapper over the store. Before any audit work, the service
//! computes an artifact key from (namespace, artifact kind, normalized
//! target, option fingerprint) and tries a read; a hit short-circuits the
//! whole job pipeline. Writes happen when a job completes and are
//! fire-and-forget: a failed write is logged and ignored, and a failed read
//! degrades to a miss. Cache trouble never fails a caller's request.

use crate::config::CacheConfig;
use crate::jobs::{AuditOptions, AuditReport};
use crate::store::SharedStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use url::Url;

/// Kind of cached audit artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    PageAudit,
    SiteAudit,
}

impl ArtifactKind {
    /// Key segment for this artifact kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageAudit => "page",
            Self::SiteAudit => "site",
        }
    }
}

/// Stored cache record: the artifact plus its original write timestamp
#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    cached_at: DateTime<Utc>,
    report: AuditReport,
}

/// An artifact served from the cache
///
/// `cached_at` is the timestamp of the original write, not of this read.
#[derive(Debug, Clone, Serialize)]
pub struct CachedArtifact {
    pub report: AuditReport,
    pub cached: bool,
    pub cached_at: DateTime<Utc>,
}

/// Builds the cache key for an audit artifact
///
/// Format: `<namespace>:<kind>:<normalized-target>:<fingerprint>`. This is
/// the single key-construction point; every reader and writer goes through
/// it so equality is guaranteed consistent.
pub fn artifact_key(namespace: &str, kind: ArtifactKind, target: &Url, fingerprint: &str) -> String {
    format!(
        "{}:{}:{}:{}",
        namespace,
        kind.as_str(),
        target.as_str(),
        fingerprint
    )
}

/// Computes a deterministic fingerprint of audit options
///
/// Two submissions with equal options always fingerprint identically, so
/// the same target audited under different settings gets distinct cache
/// entries.
pub fn fingerprint_options(options: &AuditOptions) -> String {
    // Struct field order makes the JSON canonical
    let canonical = serde_json::to_string(options).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())[..16].to_string()
}

/// Cache-first lookup/write wrapper over the store
pub struct CacheLayer {
    store: SharedStore,
    namespace: String,
    page_ttl: Duration,
    site_ttl: Duration,
}

impl CacheLayer {
    /// Creates a cache layer over a shared store
    pub fn new(store: SharedStore, config: &CacheConfig) -> Self {
        Self {
            store,
            namespace: config.namespace.clone(),
            page_ttl: Duration::from_secs(config.page_ttl_secs),
            site_ttl: Duration::from_secs(config.site_ttl_secs),
        }
    }

    /// Builds the key for an artifact under this layer's namespace
    pub fn key(&self, kind: ArtifactKind, target: &Url, fingerprint: &str) -> String {
        artifact_key(&self.namespace, kind, target, fingerprint)
    }

    /// Attempts a cache read
    ///
    /// Returns `None` on a miss, on TTL expiry, and on any store or decode
    /// error; errors are logged and never propagate.
    pub fn read(&self, key: &str) -> Option<CachedArtifact> {
        let raw = match self.store.lock().unwrap().get(key) {
            Ok(value) => value?,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}, treating as miss", key, e);
                return None;
            }
        };

        match serde_json::from_str::<CacheEnvelope>(&raw) {
            Ok(envelope) => Some(CachedArtifact {
                report: envelope.report,
                cached: true,
                cached_at: envelope.cached_at,
            }),
            Err(e) => {
                tracing::warn!("Cache entry {} is unreadable: {}, treating as miss", key, e);
                None
            }
        }
    }

    /// Writes an artifact, fire-and-forget
    ///
    /// `cached_at` should be the moment the artifact was produced (for job
    /// results, the job's completion time). Write failures are logged and
    /// dropped.
    pub fn write(&self, key: &str, kind: ArtifactKind, report: &AuditReport, cached_at: DateTime<Utc>) {
        let envelope = CacheEnvelope {
            cached_at,
            report: report.clone(),
        };

        let raw = match serde_json::to_string(&envelope) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Failed to serialize cache entry {}: {}", key, e);
                return;
            }
        };

        let ttl = match kind {
            ArtifactKind::PageAudit => self.page_ttl,
            ArtifactKind::SiteAudit => self.site_ttl,
        };

        if let Err(e) = self.store.lock().unwrap().set(key, &raw, Some(ttl)) {
            tracing::warn!("Cache write failed for {}: {}", key, e);
        }
    }

    /// Removes an artifact
    pub fn delete(&self, key: &str) {
        if let Err(e) = self.store.lock().unwrap().delete(key) {
            tracing::warn!("Cache delete failed for {}: {}", key, e);
        }
    }
}
