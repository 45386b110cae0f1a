use url::Url;

/// Extracts the domain from a URL
///
/// The domain is the lowercased host with any `www.` prefix removed, which
/// matches how [`normalize_url`](crate::url::normalize_url) rewrites hosts.
///
/// # Arguments
///
/// * `url` - The URL to extract the domain from
///
/// # Returns
///
/// * `Some(String)` - The extracted domain
/// * `None` - The URL has no host
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();

    if let Some(stripped) = host.strip_prefix("www.") {
        Some(stripped.to_string())
    } else {
        Some(host)
    }
}

/// Checks whether a candidate URL belongs to the same site as the base URL
///
/// By default the check is exact-hostname: `blog.example.com` is not the
/// same site as `example.com`. With `include_subdomains` set, any host that
/// is the base domain or a subdomain of it passes. The flag only widens
/// membership; it never changes how the crawl itself proceeds.
///
/// # Arguments
///
/// * `base` - The site's seed URL
/// * `candidate` - The discovered URL to test
/// * `include_subdomains` - Whether subdomains of the base count as in-site
pub fn is_same_site(base: &Url, candidate: &Url, include_subdomains: bool) -> bool {
    let (base_domain, candidate_domain) = match (extract_domain(base), extract_domain(candidate)) {
        (Some(b), Some(c)) => (b, c),
        _ => return false,
    };

    if base_domain == candidate_domain {
        return true;
    }

    if include_subdomains {
        return candidate_domain.ends_with(&format!(".{}", base_domain));
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain(&url("https://example.com/page")),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_extract_domain_strips_www() {
        assert_eq!(
            extract_domain(&url("https://www.example.com/")),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_extract_domain_lowercases() {
        assert_eq!(
            extract_domain(&url("https://EXAMPLE.com/")),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_same_site_exact_host() {
        assert!(is_same_site(
            &url("https://example.com/"),
            &url("https://example.com/about"),
            false
        ));
    }

    #[test]
    fn test_same_site_www_equivalence() {
        assert!(is_same_site(
            &url("https://www.example.com/"),
            &url("https://example.com/about"),
            false
        ));
    }

    #[test]
    fn test_subdomain_excluded_by_default() {
        assert!(!is_same_site(
            &url("https://example.com/"),
            &url("https://blog.example.com/post"),
            false
        ));
    }

    #[test]
    fn test_subdomain_included_with_flag() {
        assert!(is_same_site(
            &url("https://example.com/"),
            &url("https://blog.example.com/post"),
            true
        ));
    }

    #[test]
    fn test_unrelated_domain_never_matches() {
        assert!(!is_same_site(
            &url("https://example.com/"),
            &url("https://notexample.com/"),
            true
        ));
        // Suffix match must be on a dot boundary
        assert!(!is_same_site(
            &url("https://example.com/"),
            &url("https://evilexample.com/"),
            true
        ));
    }
}
