use serde::Deserialize;

/// Main configuration structure for the audit service
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            crawler: CrawlerConfig::default(),
            fetcher: FetcherConfig::default(),
            cache: CacheConfig::default(),
            store: StoreConfig::default(),
            user_agent: UserAgentConfig::default(),
        }
    }
}

/// Worker and admission-control configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// How long the worker sleeps between queue polls (milliseconds)
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum number of jobs a single externally-triggered batch processes
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum number of queued jobs before new submissions are rejected
    #[serde(rename = "max-backlog", default = "default_max_backlog")]
    pub max_backlog: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            batch_size: default_batch_size(),
            max_backlog: default_max_backlog(),
        }
    }
}

/// Default crawl budgets for site audits
///
/// These values seed [`AuditOptions`](crate::jobs::AuditOptions) when a
/// submission leaves a field unset.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of pages crawled per site audit
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum link depth from the seed URL
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Number of pages fetched in parallel within one batch
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Minimum spacing between requests to the same domain (milliseconds)
    #[serde(rename = "throttle-ms", default = "default_throttle_ms")]
    pub throttle_ms: u64,

    /// Whether site audits honor robots.txt
    #[serde(rename = "respect-robots", default = "default_true")]
    pub respect_robots: bool,

    /// Whether subdomains of the seed host count as in-site
    #[serde(rename = "include-subdomains", default)]
    pub include_subdomains: bool,

    /// Wall-clock ceiling on a whole crawl in seconds (0 = no ceiling)
    #[serde(rename = "max-crawl-seconds", default = "default_max_crawl_seconds")]
    pub max_crawl_seconds: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            max_depth: default_max_depth(),
            concurrency: default_concurrency(),
            throttle_ms: default_throttle_ms(),
            respect_robots: true,
            include_subdomains: false,
            max_crawl_seconds: default_max_crawl_seconds(),
        }
    }
}

/// Single-resource fetch limits
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Per-fetch timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum accepted payload size in bytes
    #[serde(rename = "max-body-bytes", default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Cache namespace and per-artifact TTLs
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Key namespace prefix
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// TTL for single-page audit artifacts (seconds)
    #[serde(rename = "page-ttl-secs", default = "default_page_ttl_secs")]
    pub page_ttl_secs: u64,

    /// TTL for whole-site audit artifacts (seconds)
    ///
    /// Longer than the page TTL because site audits are far more expensive
    /// to recompute.
    #[serde(rename = "site-ttl-secs", default = "default_site_ttl_secs")]
    pub site_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            page_ttl_secs: default_page_ttl_secs(),
            site_ttl_secs: default_site_ttl_secs(),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Crawler identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the auditor
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version string sent with requests
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the auditor
    #[serde(rename = "contact-url", default = "default_contact_url")]
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Formats the primary user agent string
    pub fn primary(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: default_contact_url(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_batch_size() -> usize {
    5
}

fn default_max_backlog() -> usize {
    100
}

fn default_max_pages() -> usize {
    25
}

fn default_max_depth() -> u32 {
    2
}

fn default_concurrency() -> usize {
    3
}

fn default_throttle_ms() -> u64 {
    500
}

fn default_max_crawl_seconds() -> u64 {
    300
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_namespace() -> String {
    "sitegauge".to_string()
}

fn default_page_ttl_secs() -> u64 {
    3600
}

fn default_site_ttl_secs() -> u64 {
    86400
}

fn default_database_path() -> String {
    "./sitegauge.db".to_string()
}

fn default_crawler_name() -> String {
    "Sitegauge".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_contact_url() -> String {
    "https://example.com/sitegauge".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.crawler.max_pages, 25);
        assert_eq!(config.crawler.max_depth, 2);
        assert!(config.crawler.respect_robots);
        assert!(!config.crawler.include_subdomains);
        assert!(config.cache.site_ttl_secs > config.cache.page_ttl_secs);
    }

    #[test]
    fn test_user_agent_primary_format() {
        let ua = UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
        };
        assert_eq!(ua.primary(), "TestBot/1.0 (+https://example.com/about)");
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.service.max_backlog, 100);
        assert_eq!(config.fetcher.timeout_secs, 30);
    }

    #[test]
    fn test_kebab_case_keys() {
        let config: Config = toml::from_str(
            r#"
            [crawler]
            max-pages = 10
            max-depth = 1
            include-subdomains = true

            [cache]
            page-ttl-secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.crawler.max_pages, 10);
        assert_eq!(config.crawler.max_depth, 1);
        assert!(config.crawler.include_subdomains);
        assert_eq!(config.cache.page_ttl_secs, 60);
    }
}
