//! Page analyzer boundary
//!
//! The analyzer turns fetched page content into a score/issue record. It is
//! a swappable collaborator behind the [`Analyzer`] trait: the pipeline only
//! depends on the contract, and ships [`BasicAnalyzer`] as its default
//! heuristic implementation.

mod basic;

pub use basic::BasicAnalyzer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

/// Severity of a single SEO issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Critical,
    Warning,
    Notice,
}

/// A single SEO issue found on a page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub severity: IssueSeverity,
    pub message: String,
}

impl Issue {
    pub fn critical(message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Critical,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            message: message.into(),
        }
    }

    pub fn notice(message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Notice,
            message: message.into(),
        }
    }
}

/// Structural data extracted from a page during analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageData {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub canonical: Option<String>,
    pub h1_count: usize,
    pub heading_count: usize,
    pub image_count: usize,
    pub images_missing_alt: usize,
    pub internal_link_count: usize,
    pub word_count: usize,
}

/// Result of analyzing one page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageAnalysis {
    /// Overall score, 0-100
    pub score: u8,

    /// HTTP status of the analyzed response (0 when unknown)
    pub status: u16,

    /// Issues found, most severe first
    pub issues: Vec<Issue>,

    /// Extracted page signals
    pub page_data: PageData,
}

impl PageAnalysis {
    /// Builds the zero-confidence record used when analysis itself fails
    ///
    /// An analyzer failure is scoped to one URL: the page gets a zero score
    /// and a critical issue naming the failure, and the audit continues.
    pub fn degraded(status: u16, reason: &str) -> Self {
        Self {
            score: 0,
            status,
            issues: vec![Issue::critical(format!("Analysis failed: {}", reason))],
            page_data: PageData::default(),
        }
    }
}

/// Trait for page analyzers
///
/// Implementations must be safe to call either with pre-fetched content or
/// with only a URL, in which case they perform their own fetch.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyzes a page
    ///
    /// # Arguments
    ///
    /// * `url` - The page URL (used for canonical/link resolution)
    /// * `content` - Pre-fetched HTML, or `None` to let the analyzer fetch
    async fn analyze(&self, url: &Url, content: Option<&str>) -> crate::Result<PageAnalysis>;
}
