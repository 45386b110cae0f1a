//! Crawler module
//!
//! This module contains the crawling machinery behind audits:
//! - Bounded, size-capped HTTP fetching with identity fallback
//! - Per-domain request throttling
//! - The BFS crawl frontier (dedup, depth, page budgets)
//! - The site-audit loop that ties fetching and analysis together

mod fetcher;
mod frontier;
mod parser;
mod site;
mod throttle;

pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher};
pub use frontier::{Frontier, PendingUrl, UrlState};
pub use parser::extract_links;
pub use site::{PageRecord, PageStatus, SiteCrawler};
pub use throttle::DomainThrottle;
