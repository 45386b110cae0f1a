//! HTTP fetcher implementation
//!
//! Retrieves a single resource under a bounded timeout and payload cap.
//! When a fetch fails, it is retried with an ordered list of alternate
//! identification strings before giving up; the first success wins and the
//! last failure propagates. Responses whose content type is not eligible
//! for analysis are rejected without retry.

use crate::config::{FetcherConfig, UserAgentConfig};
use reqwest::header::USER_AGENT;
use reqwest::{redirect::Policy, Client};
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

/// Alternate identification strings tried, in order, after the primary
/// user agent fails
const FALLBACK_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
];

/// Content types eligible for analysis
const ELIGIBLE_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// Errors from fetching a single resource
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Content type {content_type} for {url} is not eligible for analysis")]
    DisallowedContentType { url: String, content_type: String },

    #[error("Response for {url} exceeds size cap ({bytes} > {limit} bytes)")]
    TooLarge {
        url: String,
        bytes: usize,
        limit: usize,
    },
}

impl FetchError {
    /// Whether trying again under a different identification string could
    /// plausibly change the outcome
    ///
    /// Content-type and size rejections are properties of the resource, not
    /// of how we identified ourselves.
    fn retryable_with_alternate_identity(&self) -> bool {
        !matches!(
            self,
            Self::DisallowedContentType { .. } | Self::TooLarge { .. }
        )
    }
}

/// A successfully fetched page with transport metadata
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value
    pub content_type: String,
    /// Page body content
    pub body: String,
    /// Payload size in bytes
    pub bytes: usize,
    /// Time the fetch took
    pub elapsed: Duration,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - Default user agent string
/// * `timeout` - Per-request timeout
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.to_string())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Bounded single-resource fetcher
pub struct Fetcher {
    client: Client,
    max_body_bytes: usize,
    user_agents: Vec<String>,
}

impl Fetcher {
    /// Creates a fetcher from configuration
    ///
    /// The identification list starts with the configured primary user
    /// agent, followed by the built-in fallback strings.
    pub fn new(config: &FetcherConfig, user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        let primary = user_agent.primary();
        let client = build_http_client(&primary, Duration::from_secs(config.timeout_secs))?;

        let mut user_agents = vec![primary];
        user_agents.extend(FALLBACK_USER_AGENTS.iter().map(|s| s.to_string()));

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
            user_agents,
        })
    }

    /// The primary identification string
    pub fn primary_user_agent(&self) -> &str {
        &self.user_agents[0]
    }

    /// A reference to the underlying HTTP client
    ///
    /// Shared with collaborators (robots fetches, URL-only analysis) so the
    /// whole pipeline presents one identity and connection pool.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetches a URL, falling back across identification strings
    ///
    /// Strategies are tried in order; the first success returns and the
    /// last failure propagates. Rejections that no identity change can fix
    /// (content type, size cap) return immediately.
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let mut last_error = None;

        for (i, agent) in self.user_agents.iter().enumerate() {
            match self.attempt(url, agent).await {
                Ok(page) => return Ok(page),
                Err(e) if e.retryable_with_alternate_identity() => {
                    if i + 1 < self.user_agents.len() {
                        tracing::debug!(
                            "Fetch attempt {} for {} failed ({}), trying alternate identity",
                            i + 1,
                            url,
                            e
                        );
                    }
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        // The list is never empty, so an error was recorded
        Err(last_error.expect("fetch attempted at least once"))
    }

    /// Performs one fetch attempt under a specific identification string
    async fn attempt(&self, url: &Url, agent: &str) -> Result<FetchedPage, FetchError> {
        let started = Instant::now();

        let response = self
            .client
            .get(url.as_str())
            .header(USER_AGENT, agent)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_eligible_content_type(&content_type) {
            return Err(FetchError::DisallowedContentType {
                url: url.to_string(),
                content_type,
            });
        }

        if let Some(length) = response.content_length() {
            if length as usize > self.max_body_bytes {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    bytes: length as usize,
                    limit: self.max_body_bytes,
                });
            }
        }

        let bytes = response.bytes().await.map_err(|e| classify_error(url, e))?;

        if bytes.len() > self.max_body_bytes {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                bytes: bytes.len(),
                limit: self.max_body_bytes,
            });
        }

        let body = String::from_utf8_lossy(&bytes).into_owned();

        Ok(FetchedPage {
            final_url,
            status: status.as_u16(),
            content_type,
            bytes: bytes.len(),
            body,
            elapsed: started.elapsed(),
        })
    }
}

/// Classifies a reqwest error into the fetch error taxonomy
fn classify_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Checks whether a Content-Type header value is eligible for analysis
fn is_eligible_content_type(content_type: &str) -> bool {
    let lowered = content_type.to_lowercase();
    ELIGIBLE_CONTENT_TYPES
        .iter()
        .any(|eligible| lowered.starts_with(eligible))
}
