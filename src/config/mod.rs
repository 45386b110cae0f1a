//! Configuration module
//!
//! Loads and validates the TOML configuration that drives the audit
//! service: worker polling, crawl budgets, fetcher limits, cache TTLs, and
//! the crawler's identification strings.

mod parser;
mod types;
mod validation;

pub use parser::{load_config, load_config_with_hash};
pub use types::{
    CacheConfig, Config, CrawlerConfig, FetcherConfig, ServiceConfig, StoreConfig, UserAgentConfig,
};
pub use validation::validate_config;
