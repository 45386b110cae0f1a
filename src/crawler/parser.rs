//! Link extraction from fetched HTML
//!
//! Pulls candidate links out of a page for frontier discovery. Resolution
//! and scheme filtering happen here; normalization, same-site scoping,
//! dedup, and robots checks are the crawl loop's job.

use scraper::{Html, Selector};
use url::Url;

/// Schemes that are never crawl candidates
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Extracts candidate links from HTML content
///
/// Links come from `<a href>` elements. Anchors carrying a `download`
/// attribute and non-HTTP(S) schemes are skipped; relative hrefs are
/// resolved against `base_url`.
///
/// Parsing is fully synchronous: the parsed document is not `Send` and must
/// not outlive this call.
pub fn extract_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(link) = resolve_link(href, base_url) {
                    links.push(link);
                }
            }
        }
    }

    links
}

/// Resolves an href to an absolute URL, or rejects it as a crawl candidate
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let trimmed = href.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lowered = trimmed.to_lowercase();
    if SKIPPED_SCHEMES
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let resolved = base_url.join(trimmed).ok()?;

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }

    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/dir/page").unwrap()
    }

    #[test]
    fn test_extracts_absolute_and_relative_links() {
        let html = r#"<html><body>
            <a href="https://example.com/about">About</a>
            <a href="/contact">Contact</a>
            <a href="sibling">Sibling</a>
        </body></html>"#;

        let links = extract_links(html, &base());
        let as_strings: Vec<&str> = links.iter().map(|u| u.as_str()).collect();

        assert_eq!(
            as_strings,
            vec![
                "https://example.com/about",
                "https://example.com/contact",
                "https://example.com/dir/sibling",
            ]
        );
    }

    #[test]
    fn test_skips_non_crawlable_schemes() {
        let html = r#"<html><body>
            <a href="javascript:void(0)">js</a>
            <a href="mailto:a@example.com">mail</a>
            <a href="tel:+15551234">tel</a>
            <a href="data:text/plain,hi">data</a>
            <a href="ftp://example.com/file">ftp</a>
            <a href="/real">real</a>
        </body></html>"#;

        let links = extract_links(html, &base());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://example.com/real");
    }

    #[test]
    fn test_skips_download_links() {
        let html = r#"<html><body>
            <a href="/file.zip" download>zip</a>
            <a href="/page">page</a>
        </body></html>"#;

        let links = extract_links(html, &base());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://example.com/page");
    }

    #[test]
    fn test_empty_and_malformed_hrefs_ignored() {
        let html = r#"<html><body>
            <a href="">empty</a>
            <a href="   ">blank</a>
            <a href="http://">broken</a>
        </body></html>"#;

        let links = extract_links(html, &base());
        assert!(links.is_empty());
    }

    #[test]
    fn test_no_links() {
        let links = extract_links("<html><body><p>nothing here</p></body></html>", &base());
        assert!(links.is_empty());
    }
}
