//! Sitegauge: an asynchronous SEO audit pipeline
//!
//! This crate audits web pages and whole sites for SEO quality. Audits run as
//! background jobs: callers submit a target URL, a worker dequeues the job,
//! fetches and analyzes the page (or crawls the site within page/depth
//! budgets), and the result lands in a TTL cache so repeated audits of the
//! same target are served without recomputation.

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod crawler;
pub mod jobs;
pub mod robots;
pub mod service;
pub mod store;
pub mod url;

use thiserror::Error;
use uuid::Uuid;

/// Main error type for sitegauge operations
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid audit target: {0}")]
    Validation(String),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Analyzer error: {0}")]
    Analyzer(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Job {0} has not completed yet")]
    JobNotCompleted(Uuid),

    #[error("Job {id} failed: {message}")]
    JobFailed { id: Uuid, message: String },

    #[error("No pages could be crawled from {0}")]
    NoPagesCrawled(String),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for sitegauge operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use analyzer::{Analyzer, BasicAnalyzer, PageAnalysis};
pub use config::Config;
pub use jobs::{AuditOptions, AuditReport, JobKind, JobRecord, JobStatus};
pub use service::{AuditService, JobStatusView, SubmitOutcome};
pub use url::{extract_domain, is_same_site, normalize_url};
