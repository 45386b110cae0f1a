//! Site-audit crawl loop
//!
//! Ties the frontier, throttle, fetcher, and analyzer together into the
//! BFS crawl that backs a site-audit job: draw a batch from the frontier,
//! wait out per-domain throttle windows, fetch and analyze the batch with
//! bounded parallelism, then admit newly discovered same-site links.
//!
//! A single page failure never aborts the crawl; it becomes a failed page
//! record and traversal continues. The crawl ends when the frontier is
//! exhausted, the page budget is spent, the wall-clock ceiling is hit, or
//! a cooperative stop is observed between batches. Partial results from an
//! early termination are a valid completed outcome.

use crate::analyzer::{Analyzer, PageAnalysis};
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::extract_links;
use crate::crawler::throttle::DomainThrottle;
use crate::crawler::Fetcher;
use crate::jobs::AuditOptions;
use crate::robots::{fetch_robots, ParsedRobots};
use crate::url::{extract_domain, is_same_site, normalize_url};
use crate::AuditError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Terminal outcome of one crawled URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Crawled,
    Failed,
}

/// One URL's crawl result, immutable once created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub status: PageStatus,
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<PageAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What one fetch+analyze task hands back to the crawl loop
struct PageOutcome {
    record: PageRecord,
    links: Vec<Url>,
}

/// Bounded-concurrency site crawler
///
/// One instance drives one site-audit job. Its frontier, throttle map, and
/// robots cache are private to the crawl; the fetcher and analyzer are the
/// only shared collaborators.
pub struct SiteCrawler {
    fetcher: Arc<Fetcher>,
    analyzer: Arc<dyn Analyzer>,
    user_agent: String,
    options: AuditOptions,
    /// Wall-clock ceiling for the whole crawl, `None` for no ceiling
    max_crawl_time: Option<Duration>,
    stop: Arc<AtomicBool>,
}

impl SiteCrawler {
    pub fn new(
        fetcher: Arc<Fetcher>,
        analyzer: Arc<dyn Analyzer>,
        options: AuditOptions,
        max_crawl_time: Option<Duration>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let user_agent = fetcher.primary_user_agent().to_string();
        Self {
            fetcher,
            analyzer,
            user_agent,
            options,
            max_crawl_time,
            stop,
        }
    }

    /// Handle for requesting a cooperative stop
    ///
    /// The flag is observed between batches only; in-flight fetches in the
    /// current batch are allowed to finish.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Crawls a site from the seed URL
    ///
    /// `on_progress` receives advisory progress values (0-99, monotonic)
    /// between batches. Returns all page records in batch-dispatch order.
    pub async fn crawl<F>(&self, seed: &Url, mut on_progress: F) -> crate::Result<Vec<PageRecord>>
    where
        F: FnMut(u8),
    {
        let seed = normalize_url(seed.as_str())?;
        let mut robots_cache: HashMap<String, ParsedRobots> = HashMap::new();

        if !self.url_allowed(&mut robots_cache, &seed).await {
            return Err(AuditError::Validation(format!(
                "Seed URL {} is disallowed by robots.txt",
                seed
            )));
        }

        let mut frontier = Frontier::new(self.options.max_pages, self.options.max_depth);
        frontier.seed(&seed);

        let mut throttle = DomainThrottle::new(Duration::from_millis(self.options.throttle_ms));
        let started = Instant::now();
        let mut records = Vec::new();
        let mut progress = 0u8;

        while frontier.has_pending() && frontier.has_budget() {
            if self.stop.load(Ordering::SeqCst) {
                tracing::info!("Crawl of {} stopped cooperatively", seed);
                break;
            }

            if let Some(ceiling) = self.max_crawl_time {
                if started.elapsed() >= ceiling {
                    tracing::warn!(
                        "Crawl of {} hit the {:?} wall-clock ceiling, returning partial results",
                        seed,
                        ceiling
                    );
                    break;
                }
            }

            let batch = frontier.draw_batch(self.options.concurrency);
            if batch.is_empty() {
                break;
            }

            // Dispatch the batch with per-domain spacing. Awaiting the
            // throttle here staggers same-domain requests even though the
            // fetches themselves run in parallel.
            let mut handles = Vec::with_capacity(batch.len());
            for item in &batch {
                let domain = extract_domain(&item.url).unwrap_or_default();
                let window = self.effective_window(&robots_cache, &item.url, &throttle);
                throttle.wait_turn(&domain, window).await;

                let fetcher = Arc::clone(&self.fetcher);
                let analyzer = Arc::clone(&self.analyzer);
                let url = item.url.clone();
                let depth = item.depth;
                handles.push(tokio::spawn(async move {
                    process_page(fetcher, analyzer, url, depth).await
                }));
            }

            // Collect in dispatch order, so records are deterministic per
            // batch even when completions interleave
            for (item, handle) in batch.iter().zip(handles) {
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => PageOutcome {
                        record: PageRecord {
                            url: item.url.to_string(),
                            status: PageStatus::Failed,
                            depth: item.depth,
                            analysis: None,
                            error: Some(format!("crawl task panicked: {}", e)),
                        },
                        links: Vec::new(),
                    },
                };

                match outcome.record.status {
                    PageStatus::Crawled => frontier.mark_crawled(&item.url),
                    PageStatus::Failed => frontier.mark_failed(&item.url),
                }

                self.admit_links(&mut frontier, &mut robots_cache, &seed, item.depth, outcome.links)
                    .await;

                records.push(outcome.record);
            }

            progress = progress.max(estimate_progress(&frontier, self.options.max_pages));
            on_progress(progress);
        }

        tracing::info!(
            "Crawl of {} finished: {} crawled, {} failed, {} discovered",
            seed,
            frontier.crawled_count(),
            frontier.failed_count(),
            frontier.discovered_count()
        );

        Ok(records)
    }

    /// Normalizes, scopes, dedups, and robots-checks links from one page,
    /// admitting survivors to the frontier at `depth + 1`
    async fn admit_links(
        &self,
        frontier: &mut Frontier,
        robots_cache: &mut HashMap<String, ParsedRobots>,
        seed: &Url,
        depth: u32,
        links: Vec<Url>,
    ) {
        for link in links {
            let normalized = match normalize_url(link.as_str()) {
                Ok(url) => url,
                Err(_) => continue,
            };

            if !is_same_site(seed, &normalized, self.options.include_subdomains) {
                continue;
            }

            if frontier.is_discovered(&normalized) {
                continue;
            }

            // Past the depth horizon; skip before the robots lookup
            if depth + 1 > self.options.max_depth {
                continue;
            }

            // Robots is checked once per URL, here at enqueue time; a URL
            // that fails the check never enters the frontier at all
            if !self.url_allowed(robots_cache, &normalized).await {
                tracing::debug!("Skipping {} (disallowed by robots.txt)", normalized);
                continue;
            }

            frontier.discover(&normalized, depth + 1);
        }
    }

    /// Checks robots permission for a URL, fetching the origin's policy on
    /// first contact
    async fn url_allowed(
        &self,
        robots_cache: &mut HashMap<String, ParsedRobots>,
        url: &Url,
    ) -> bool {
        if !self.options.respect_robots {
            return true;
        }

        let origin = url.origin().ascii_serialization();
        if !robots_cache.contains_key(&origin) {
            let robots = fetch_robots(self.fetcher.client(), url).await;
            robots_cache.insert(origin.clone(), robots);
        }

        robots_cache[&origin].is_allowed(url.as_str(), &self.user_agent)
    }

    /// The throttle window for a URL: the configured spacing, widened by
    /// any robots.txt crawl delay for its origin
    fn effective_window(
        &self,
        robots_cache: &HashMap<String, ParsedRobots>,
        url: &Url,
        throttle: &DomainThrottle,
    ) -> Duration {
        let origin = url.origin().ascii_serialization();
        let delay = robots_cache
            .get(&origin)
            .and_then(|robots| robots.crawl_delay(&self.user_agent));

        match delay {
            Some(secs) if secs > 0.0 => throttle
                .default_window()
                .max(Duration::from_secs_f64(secs)),
            _ => throttle.default_window(),
        }
    }
}

/// Fetches and analyzes one URL
///
/// Runs as a spawned task. Link extraction and analysis both parse the body
/// synchronously; no parsed document lives across an await point.
async fn process_page(
    fetcher: Arc<Fetcher>,
    analyzer: Arc<dyn Analyzer>,
    url: Url,
    depth: u32,
) -> PageOutcome {
    let page = match fetcher.fetch(&url).await {
        Ok(page) => page,
        Err(e) => {
            tracing::debug!("Fetch of {} failed: {}", url, e);
            return PageOutcome {
                record: PageRecord {
                    url: url.to_string(),
                    status: PageStatus::Failed,
                    depth,
                    analysis: None,
                    error: Some(e.to_string()),
                },
                links: Vec::new(),
            };
        }
    };

    let links = extract_links(&page.body, &url);

    // An analyzer failure is scoped to this URL: the page still counts as
    // crawled, with a zero-confidence analysis
    let analysis = match analyzer.analyze(&url, Some(&page.body)).await {
        Ok(analysis) => analysis,
        Err(e) => {
            tracing::warn!("Analysis of {} failed: {}", url, e);
            PageAnalysis::degraded(page.status, &e.to_string())
        }
    };

    PageOutcome {
        record: PageRecord {
            url: url.to_string(),
            status: PageStatus::Crawled,
            depth,
            analysis: Some(analysis),
            error: None,
        },
        links,
    }
}

/// Advisory progress from frontier counts
///
/// The horizon is what the crawl can still reach: pages done plus pending,
/// capped by the page budget. Capped at 99 so only job completion reports
/// 100.
fn estimate_progress(frontier: &Frontier, max_pages: usize) -> u8 {
    let done = frontier.crawled_count() + frontier.failed_count();
    let horizon = max_pages.min(done + frontier.pending_count()).max(1);
    (((done * 100) / horizon).min(99)) as u8
}
