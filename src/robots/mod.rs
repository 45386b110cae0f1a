//! Robots.txt handling module
//!
//! Fetches and evaluates robots.txt policies. A missing, unreadable, or
//! error-status robots.txt means allow-by-default; the crawler checks each
//! discovered URL against the policy once, at enqueue time.

mod parser;

pub use parser::ParsedRobots;

use reqwest::Client;
use url::Url;

/// Fetches and parses robots.txt for a URL's origin
///
/// The robots.txt location is derived from the scheme, host, and port of
/// `origin`. Any failure to fetch (network error, non-2xx status, unreadable
/// body) yields the permissive policy rather than an error: absence of a
/// policy means allow-by-default.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `origin` - Any URL on the origin whose policy is wanted
pub async fn fetch_robots(client: &Client, origin: &Url) -> ParsedRobots {
    let mut robots_url = origin.clone();
    robots_url.set_path("/robots.txt");
    robots_url.set_query(None);
    robots_url.set_fragment(None);

    match client.get(robots_url.as_str()).send().await {
        Ok(response) if response.status().is_success() => match response.text().await {
            Ok(body) => ParsedRobots::from_content(&body),
            Err(e) => {
                tracing::debug!("Failed to read robots.txt body for {}: {}", origin, e);
                ParsedRobots::allow_all()
            }
        },
        Ok(response) => {
            tracing::debug!(
                "robots.txt for {} returned HTTP {}, allowing all",
                origin,
                response.status()
            );
            ParsedRobots::allow_all()
        }
        Err(e) => {
            tracing::debug!("Failed to fetch robots.txt for {}: {}", origin, e);
            ParsedRobots::allow_all()
        }
    }
}
