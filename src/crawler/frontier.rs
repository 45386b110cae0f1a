//! Crawl frontier
//!
//! The frontier is the working set of URLs for one site-audit job. Each URL
//! moves through a one-way state machine:
//!
//! ```text
//! discovered -> pending -> crawling -> {crawled | failed}
//! ```
//!
//! A URL never re-enters `pending` once crawled or failed, so the crawl
//! cannot loop. All membership tests run on already-normalized URLs; the
//! frontier itself does no normalization.
//!
//! Invariants held at all times:
//! - `discovered` is a superset of pending, crawling, crawled, and failed
//! - a URL's depth is fixed at first discovery and never exceeds `max_depth`
//! - the number of crawled URLs never exceeds `max_pages`
//!
//! A frontier is owned by exactly one job execution and needs no locking.

use std::collections::{HashSet, VecDeque};
use url::Url;

/// Where a URL currently sits in the frontier's state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlState {
    Pending,
    Crawling,
    Crawled,
    Failed,
}

/// A discovered URL waiting to be crawled
#[derive(Debug, Clone)]
pub struct PendingUrl {
    pub url: Url,
    /// Link distance from the seed, fixed at first discovery
    pub depth: u32,
}

/// BFS frontier for one site-audit job
pub struct Frontier {
    discovered: HashSet<String>,
    pending: VecDeque<PendingUrl>,
    crawling: HashSet<String>,
    crawled: HashSet<String>,
    failed: HashSet<String>,
    max_pages: usize,
    max_depth: u32,
}

impl Frontier {
    /// Creates an empty frontier with the given crawl budgets
    pub fn new(max_pages: usize, max_depth: u32) -> Self {
        Self {
            discovered: HashSet::new(),
            pending: VecDeque::new(),
            crawling: HashSet::new(),
            crawled: HashSet::new(),
            failed: HashSet::new(),
            max_pages,
            max_depth,
        }
    }

    /// Seeds the frontier with the crawl's start URL at depth 0
    pub fn seed(&mut self, url: &Url) {
        self.discover(url, 0);
    }

    /// Admits a URL at the given depth
    ///
    /// Returns `false` without admitting when the URL is already known or
    /// the depth exceeds `max_depth`. The depth recorded here is final: a
    /// later rediscovery at a different depth is a no-op.
    pub fn discover(&mut self, url: &Url, depth: u32) -> bool {
        if depth > self.max_depth {
            return false;
        }

        if !self.discovered.insert(url.as_str().to_string()) {
            return false;
        }

        self.pending.push_back(PendingUrl {
            url: url.clone(),
            depth,
        });
        true
    }

    /// Whether a URL has ever been admitted
    pub fn is_discovered(&self, url: &Url) -> bool {
        self.discovered.contains(url.as_str())
    }

    /// Draws the next batch of URLs to crawl, up to `concurrency`
    ///
    /// The draw is additionally capped by the remaining page budget,
    /// counting in-flight URLs, so a fully successful batch can never push
    /// the crawled count past `max_pages`. Drawn URLs move to `crawling`.
    pub fn draw_batch(&mut self, concurrency: usize) -> Vec<PendingUrl> {
        let budget = self
            .max_pages
            .saturating_sub(self.crawled.len() + self.crawling.len());
        let take = concurrency.min(budget);

        let mut batch = Vec::with_capacity(take);
        while batch.len() < take {
            match self.pending.pop_front() {
                Some(next) => {
                    self.crawling.insert(next.url.as_str().to_string());
                    batch.push(next);
                }
                None => break,
            }
        }
        batch
    }

    /// Records a successful crawl of a drawn URL
    pub fn mark_crawled(&mut self, url: &Url) {
        self.crawling.remove(url.as_str());
        self.crawled.insert(url.as_str().to_string());
    }

    /// Records a failed crawl of a drawn URL
    ///
    /// Failures do not count against the page budget.
    pub fn mark_failed(&mut self, url: &Url) {
        self.crawling.remove(url.as_str());
        self.failed.insert(url.as_str().to_string());
    }

    /// Whether any URLs are waiting to be drawn
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Whether the page budget allows crawling more URLs
    pub fn has_budget(&self) -> bool {
        self.crawled.len() < self.max_pages
    }

    /// The state of a URL, or `None` if it was never discovered
    pub fn state_of(&self, url: &Url) -> Option<UrlState> {
        let key = url.as_str();
        if self.crawled.contains(key) {
            Some(UrlState::Crawled)
        } else if self.failed.contains(key) {
            Some(UrlState::Failed)
        } else if self.crawling.contains(key) {
            Some(UrlState::Crawling)
        } else if self.discovered.contains(key) {
            Some(UrlState::Pending)
        } else {
            None
        }
    }

    pub fn discovered_count(&self) -> usize {
        self.discovered.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn crawled_count(&self) -> usize {
        self.crawled.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}
