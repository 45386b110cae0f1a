//! Robots.txt policy evaluation
//!
//! Wraps the robotstxt crate behind a small policy type with an explicit
//! permissive default.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data
///
/// Holds the raw robots.txt content and evaluates allow/disallow rules and
/// crawl delays on demand. An empty or explicitly permissive policy allows
/// every URL.
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
    /// Whether to allow all without consulting the content
    allow_all: bool,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// This is the default when robots.txt cannot be fetched, or when the
    /// audit was configured with robots compliance disabled.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - The URL or URL path to check (e.g., "/page.html")
    /// * `user_agent` - The user agent string
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Gets the crawl delay for a specific user agent
    ///
    /// The crawl delay feeds into the per-domain throttle window: the
    /// effective spacing between requests is the larger of the configured
    /// window and this value.
    ///
    /// # Returns
    ///
    /// * `Some(f64)` - The crawl delay in seconds
    /// * `None` - If no crawl delay is specified
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        if self.allow_all || self.content.is_empty() {
            return None;
        }

        // The robotstxt crate does not surface Crawl-delay, so parse the
        // directive here. A Crawl-delay applies to the most recent
        // User-agent group.
        let mut current_user_agents: Vec<String> = Vec::new();
        let mut crawl_delay_for_wildcard: Option<f64> = None;
        let mut crawl_delay_for_agent: Option<f64> = None;

        let normalized_agent = user_agent.to_lowercase();

        for line in self.content.lines() {
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = trimmed.split_once(':') {
                let key = key.trim().to_lowercase();
                let value = value.trim();

                match key.as_str() {
                    "user-agent" => {
                        // Multiple User-agent lines belong to the same group
                        current_user_agents.push(value.to_lowercase());
                    }
                    "crawl-delay" => {
                        if let Ok(delay) = value.parse::<f64>() {
                            if current_user_agents
                                .iter()
                                .any(|ua| ua == "*" || normalized_agent.contains(ua))
                            {
                                if current_user_agents.contains(&"*".to_string()) {
                                    crawl_delay_for_wildcard = Some(delay);
                                } else {
                                    crawl_delay_for_agent = Some(delay);
                                }
                            }
                        }
                        current_user_agents.clear();
                    }
                    _ => {}
                }
            }
        }

        crawl_delay_for_agent.or(crawl_delay_for_wildcard)
    }
}
