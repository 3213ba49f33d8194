//! Crawl target configuration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// CSS selector sets used by the extractor for a given source. Kept as
/// plain strings rather than a parsed `scraper::Selector` because the
/// admin API round-trips these through JSON and Postgres `jsonb`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SourceSelectors {
    /// Selectors identifying an article link on a listing page.
    #[serde(default)]
    pub article: Vec<String>,
    /// Selectors identifying a pagination/listing page link.
    #[serde(default)]
    pub list: Vec<String>,
    /// Selectors to strip before extraction (ads, nav, related-articles
    /// rails) so they don't pollute `RawContent.raw_text`.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Comma-separated selector list, tried in order, for the body's
    /// containing element (`extractTextFromContainer`'s first argument).
    #[serde(default)]
    pub container: Option<String>,
    /// Comma-separated selector list for the body text itself, used
    /// when no `container` matches.
    #[serde(default)]
    pub body: Option<String>,
    /// Comma-separated selector list for the article title, tried before
    /// falling back to `og:title`/`<title>`/`<h1>`.
    #[serde(default)]
    pub title: Option<String>,
    /// Selector for an element carrying the published time, whose
    /// `datetime` attribute (then text) is tried before meta fallbacks.
    #[serde(default)]
    pub published_time: Option<String>,
    /// Selector for the author's display name.
    #[serde(default)]
    pub author: Option<String>,
    /// Selector for a byline element, tried after the `article:author`
    /// meta tag and rel=author link.
    #[serde(default)]
    pub byline: Option<String>,
    /// Selector for a comma-separated keywords element, falling back to
    /// `<meta name="keywords">`.
    #[serde(default)]
    pub keywords: Option<String>,
    /// Selector for a comma-separated tags element.
    #[serde(default)]
    pub tags: Option<String>,
    /// Paragraph selector for the aggressive paragraph-collection body
    /// fallback (step 5 of the body chain).
    #[serde(default)]
    pub paragraph: Option<String>,
}

/// A crawl target: a publication or site the pipeline ingests from.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct Source {
    pub id: Uuid,
    pub name: String,
    pub seed_url: String,
    /// Host strings the crawl may follow into, e.g. `news.example.com` or
    /// `*.example.com`. Links outside these hosts are recorded in
    /// `discovered_links` but never enqueued to the frontier.
    pub allowed_domains: Vec<String>,
    #[sqlx(json)]
    pub selectors: SourceSelectors,
    /// Minimum delay between requests to this source's hosts, in
    /// milliseconds. Overrides `HostState.min_delay_ms` when set.
    pub rate_limit_ms: Option<i64>,
    pub max_depth: i32,
    pub enabled: bool,
    /// Search index name(s) this source's articles should be written to,
    /// beyond the default. Empty means "default index only".
    pub index_names: Vec<String>,
}

impl Source {
    /// Does `host` fall under one of this source's allowed domains,
    /// honoring a single leading `*.` wildcard?
    pub fn allows_host(&self, host: &str) -> bool {
        self.allowed_domains.iter().any(|pattern| {
            if let Some(suffix) = pattern.strip_prefix("*.") {
                host == suffix || host.ends_with(&format!(".{suffix}"))
            } else {
                host == pattern
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_with_domains(domains: &[&str]) -> Source {
        Source {
            id: Uuid::new_v4(),
            name: "Test Source".to_string(),
            seed_url: "https://news.example.com".to_string(),
            allowed_domains: domains.iter().map(|s| s.to_string()).collect(),
            selectors: SourceSelectors::default(),
            rate_limit_ms: None,
            max_depth: 3,
            enabled: true,
            index_names: vec![],
        }
    }

    #[test]
    fn exact_host_match() {
        let source = source_with_domains(&["news.example.com"]);
        assert!(source.allows_host("news.example.com"));
        assert!(!source.allows_host("other.example.com"));
    }

    #[test]
    fn wildcard_matches_subdomains_and_apex() {
        let source = source_with_domains(&["*.example.com"]);
        assert!(source.allows_host("news.example.com"));
        assert!(source.allows_host("example.com"));
        assert!(!source.allows_host("example.org"));
    }
}
