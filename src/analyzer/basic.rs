//! Built-in heuristic analyzer
//!
//! Scores a page from structural SEO signals: title and meta description
//! presence and length, heading structure, image alt coverage, and a
//! canonical link. The scoring weights are deliberately simple; the
//! pipeline treats any [`Analyzer`] implementation as interchangeable.

use crate::analyzer::{Analyzer, Issue, PageAnalysis, PageData};
use crate::url::is_same_site;
use crate::AuditError;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

/// Recommended bounds for title length, in characters
const TITLE_LENGTH_RANGE: (usize, usize) = (10, 60);

/// Recommended bounds for meta description length, in characters
const DESCRIPTION_LENGTH_RANGE: (usize, usize) = (50, 160);

/// Heuristic SEO analyzer
pub struct BasicAnalyzer {
    client: Client,
}

impl BasicAnalyzer {
    /// Creates a new analyzer that fetches with the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Analyzer for BasicAnalyzer {
    async fn analyze(&self, url: &Url, content: Option<&str>) -> crate::Result<PageAnalysis> {
        match content {
            Some(html) => Ok(analyze_content(url, html, 200)),
            None => {
                // URL-only mode: perform our own fetch
                let response = self.client.get(url.as_str()).send().await?;
                let status = response.status().as_u16();

                if !response.status().is_success() {
                    return Err(AuditError::Analyzer(format!(
                        "fetch for analysis returned HTTP {}",
                        status
                    )));
                }

                let body = response.text().await?;
                Ok(analyze_content(url, &body, status))
            }
        }
    }
}

/// Analyzes pre-fetched HTML content
///
/// Parsing happens entirely inside this synchronous function: `scraper`'s
/// document type is not `Send`, so it must not live across an await point.
pub fn analyze_content(url: &Url, html: &str, status: u16) -> PageAnalysis {
    let document = Html::parse_document(html);
    let mut issues = Vec::new();

    let title = select_text(&document, "title");
    let meta_description = select_attr(&document, "meta[name=description]", "content");
    let canonical = select_attr(&document, "link[rel=canonical]", "href");

    let h1_count = count_matches(&document, "h1");
    let heading_count = count_matches(&document, "h1, h2, h3, h4, h5, h6");
    let (image_count, images_missing_alt) = count_images(&document);
    let internal_link_count = count_internal_links(&document, url);
    let word_count = count_words(&document);

    match &title {
        None => issues.push(Issue::critical("Missing <title> tag")),
        Some(t) if t.len() < TITLE_LENGTH_RANGE.0 => {
            issues.push(Issue::warning("Title is too short"))
        }
        Some(t) if t.len() > TITLE_LENGTH_RANGE.1 => {
            issues.push(Issue::warning("Title is too long"))
        }
        _ => {}
    }

    match &meta_description {
        None => issues.push(Issue::critical("Missing meta description")),
        Some(d) if d.len() < DESCRIPTION_LENGTH_RANGE.0 => {
            issues.push(Issue::warning("Meta description is too short"))
        }
        Some(d) if d.len() > DESCRIPTION_LENGTH_RANGE.1 => {
            issues.push(Issue::warning("Meta description is too long"))
        }
        _ => {}
    }

    match h1_count {
        0 => issues.push(Issue::critical("No <h1> heading")),
        1 => {}
        _ => issues.push(Issue::warning("Multiple <h1> headings")),
    }

    if images_missing_alt > 0 {
        issues.push(Issue::warning(format!(
            "{} of {} images missing alt text",
            images_missing_alt, image_count
        )));
    }

    if canonical.is_none() {
        issues.push(Issue::notice("No canonical link"));
    }

    if word_count < 100 {
        issues.push(Issue::notice("Thin content (under 100 words)"));
    }

    let score = compute_score(&issues);

    PageAnalysis {
        score,
        status,
        issues,
        page_data: PageData {
            title,
            meta_description,
            canonical,
            h1_count,
            heading_count,
            image_count,
            images_missing_alt,
            internal_link_count,
            word_count,
        },
    }
}

/// Derives the 0-100 score from the issue list
fn compute_score(issues: &[Issue]) -> u8 {
    let penalty: u32 = issues
        .iter()
        .map(|issue| match issue.severity {
            crate::analyzer::IssueSeverity::Critical => 25,
            crate::analyzer::IssueSeverity::Warning => 10,
            crate::analyzer::IssueSeverity::Notice => 5,
        })
        .sum();

    100u32.saturating_sub(penalty) as u8
}

fn select_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn select_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr(attr))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn count_matches(document: &Html, selector: &str) -> usize {
    Selector::parse(selector)
        .map(|s| document.select(&s).count())
        .unwrap_or(0)
}

/// Counts images and how many of them lack a non-empty alt attribute
fn count_images(document: &Html) -> (usize, usize) {
    let selector = match Selector::parse("img") {
        Ok(s) => s,
        Err(_) => return (0, 0),
    };

    let mut total = 0;
    let mut missing_alt = 0;
    for element in document.select(&selector) {
        total += 1;
        let alt = element.value().attr("alt").map(str::trim).unwrap_or("");
        if alt.is_empty() {
            missing_alt += 1;
        }
    }
    (total, missing_alt)
}

fn count_internal_links(document: &Html, base: &Url) -> usize {
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return 0,
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .filter(|link| is_same_site(base, link, false))
        .count()
}

fn count_words(document: &Html) -> usize {
    let selector = match Selector::parse("body") {
        Ok(s) => s,
        Err(_) => return 0,
    };

    document
        .select(&selector)
        .next()
        .map(|body| body.text().collect::<String>().split_whitespace().count())
        .unwrap_or(0)
}
