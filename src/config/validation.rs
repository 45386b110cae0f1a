//! Configuration validation
//!
//! Sanity checks applied after parsing, before any component is built from
//! the configuration.

use crate::config::Config;
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Validates a parsed configuration
///
/// Checks ranges on crawl budgets, fetch limits, cache TTLs, and the
/// admission backlog, and verifies the contact URL parses.
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    if config.crawler.max_pages == 0 {
        return Err(ConfigError::Validation(
            "crawler.max-pages must be at least 1".to_string(),
        ));
    }

    if config.crawler.concurrency == 0 || config.crawler.concurrency > 16 {
        return Err(ConfigError::Validation(format!(
            "crawler.concurrency must be between 1 and 16, got {}",
            config.crawler.concurrency
        )));
    }

    if config.fetcher.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "fetcher.timeout-secs must be greater than 0".to_string(),
        ));
    }

    if config.fetcher.max_body_bytes == 0 {
        return Err(ConfigError::Validation(
            "fetcher.max-body-bytes must be greater than 0".to_string(),
        ));
    }

    if config.cache.page_ttl_secs == 0 || config.cache.site_ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "cache TTLs must be greater than 0".to_string(),
        ));
    }

    if config.cache.namespace.is_empty() || config.cache.namespace.contains(':') {
        return Err(ConfigError::Validation(
            "cache.namespace must be non-empty and must not contain ':'".to_string(),
        ));
    }

    if config.service.max_backlog == 0 {
        return Err(ConfigError::Validation(
            "service.max-backlog must be at least 1".to_string(),
        ));
    }

    if config.service.batch_size == 0 {
        return Err(ConfigError::Validation(
            "service.batch-size must be at least 1".to_string(),
        ));
    }

    if Url::parse(&config.user_agent.contact_url).is_err() {
        return Err(ConfigError::InvalidUrl(
            config.user_agent.contact_url.clone(),
        ));
    }

    Ok(())
}
