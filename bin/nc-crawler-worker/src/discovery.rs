//! Link discovery from a fetched page (§3 `DiscoveredLink`, §4.2's
//! frontier `Upsert`). Distinct from extraction: this only looks at
//! `<a href>` elements matching a source's `article`/`list` selectors,
//! never the article body chain.
//!
//! Grounded on the same `scraper::{Html, Selector}` idiom
//! `nc-extract::extractor` uses, since this is the only other place in
//! the workspace that walks a parsed HTML tree.

use nc_domain::{FrontierOrigin, FrontierUrl, Source};
use scraper::{Html, Selector};
use url::Url;

/// One link worth enqueuing: its absolute URL and the host it resolved
/// to (frontier rows are keyed by host for politeness, so resolution
/// happens once here rather than at claim time).
pub struct DiscoveredUrl {
    pub url: String,
    pub host: String,
}

/// Finds every link under `source.selectors.article` or
/// `.list`, resolves it against `page_url`, and keeps only links whose
/// host is allowed for `source` — out-of-domain links are still worth
/// recording in `discovered_links` for observability, but the caller
/// decides that; this function only returns frontier-eligible links.
pub fn discover_links(html: &str, page_url: &str, source: &Source) -> Vec<DiscoveredUrl> {
    let Ok(base) = Url::parse(page_url) else { return Vec::new() };
    let document = Html::parse_document(html);

    let mut selector_list: Vec<&str> = source.selectors.article.iter().map(String::as_str).collect();
    selector_list.extend(source.selectors.list.iter().map(String::as_str));
    if selector_list.is_empty() {
        selector_list.push("a[href]");
    }

    let mut out = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for raw_selector in selector_list {
        // A selector may target the anchor itself (`a.headline`) or a
        // container around one (`.card`); try both the element's own
        // `href` and any descendant anchor's.
        let Ok(selector) = Selector::parse(raw_selector) else { continue };
        let Ok(descendant_anchor) = Selector::parse("a[href]") else { continue };

        for el in document.select(&selector) {
            let hrefs: Vec<&str> = match el.value().attr("href") {
                Some(href) => vec![href],
                None => el.select(&descendant_anchor).filter_map(|a| a.value().attr("href")).collect(),
            };

            for href in hrefs {
                let Ok(mut resolved) = base.join(href) else { continue };
                resolved.set_fragment(None);
                let absolute = resolved.to_string();

                let Some(host) = resolved.host_str().map(str::to_string) else { continue };
                if !source.allows_host(&host) {
                    continue;
                }
                if !seen.insert(absolute.clone()) {
                    continue;
                }
                out.push(DiscoveredUrl { url: absolute, host });
            }
        }
    }

    out
}

/// Builds a frontier row for a discovered link, one `depth` below its
/// parent, capped by `source.max_depth`.
pub fn to_frontier_url(discovered: &DiscoveredUrl, source: &Source, parent_url: &str, parent_depth: i32) -> Option<FrontierUrl> {
    let depth = parent_depth + 1;
    if depth > source.max_depth {
        return None;
    }
    Some(FrontierUrl::new(
        discovered.url.clone(),
        discovered.host.clone(),
        source.id,
        FrontierOrigin::Discovered,
        Some(parent_url.to_string()),
        depth,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nc_domain::SourceSelectors;
    use uuid::Uuid;

    fn source(max_depth: i32) -> Source {
        Source {
            id: Uuid::new_v4(),
            name: "Example".to_string(),
            seed_url: "https://news.example.com".to_string(),
            allowed_domains: vec!["news.example.com".to_string()],
            selectors: SourceSelectors::default(),
            rate_limit_ms: None,
            max_depth,
            enabled: true,
            index_names: vec![],
        }
    }

    #[test]
    fn resolves_relative_links_and_filters_by_domain() {
        let html = r#"<html><body>
            <a href="/story-1">One</a>
            <a href="https://other.example.com/story-2">Two</a>
        </body></html>"#;
        let links = discover_links(html, "https://news.example.com/section", &source(3));
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://news.example.com/story-1");
    }

    #[test]
    fn depth_cap_stops_further_discovery() {
        let discovered = DiscoveredUrl { url: "https://news.example.com/a".to_string(), host: "news.example.com".to_string() };
        assert!(to_frontier_url(&discovered, &source(1), "https://news.example.com", 1).is_none());
        assert!(to_frontier_url(&discovered, &source(2), "https://news.example.com", 1).is_some());
    }
}
