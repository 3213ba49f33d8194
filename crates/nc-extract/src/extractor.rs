//! Top-level extraction entry point: runs every chain in §4.3 over one
//! fetched page and assembles a [`RawContent`].

use std::collections::BTreeMap;

use chrono::Utc;
use nc_domain::{normalize_json_ld, ClassificationStatus, RawContent, SourceSelectors};
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::author::extract_author;
use crate::body::extract_body;
use crate::date::extract_published_date;
use crate::jsonld;
use crate::selectors::{extract_attr, extract_meta, extract_meta_name};
use crate::tags::extract_tags;
use crate::title::extract_title;

pub struct Extractor;

impl Extractor {
    pub fn extract(html: &str, url: &str, source_id: Uuid, source_name: &str, selectors: &SourceSelectors) -> RawContent {
        let document = Html::parse_document(html);

        let title = extract_title(&document, selectors.title.as_deref()).unwrap_or_default();
        let raw_text = extract_body(
            &document,
            selectors.container.as_deref(),
            selectors.body.as_deref(),
            &selectors.exclude.join(", "),
            selectors.paragraph.as_deref(),
        );
        let author = extract_author(&document, selectors.author.as_deref(), selectors.byline.as_deref());
        let published_date = extract_published_date(&document, selectors.published_time.as_deref());
        let extracted_tags = extract_tags(&document, selectors.keywords.as_deref(), selectors.tags.as_deref());

        let description = extract_meta_name(&document, "description")
            .or_else(|| extract_meta(&document, "og:description"))
            .or_else(|| jsonld::find_article(&document).and_then(|a| a.get("description").and_then(Value::as_str).map(str::to_string)));

        let canonical_url = extract_attr(&document, "link[rel='canonical']", "href").or_else(|| extract_meta(&document, "og:url"));

        let article_section = extract_meta(&document, "article:section")
            .or_else(|| jsonld::find_article(&document).and_then(|a| a.get("articleSection").and_then(Value::as_str).map(str::to_string)));

        let og = normalize_json_ld(&collect_prefixed_meta(&document, "property", "og:"));
        let twitter = normalize_json_ld(&collect_prefixed_meta(&document, "name", "twitter:"));
        let json_ld = jsonld::find_article(&document).map(|v| normalize_json_ld(&v)).unwrap_or_default();

        let id = nc_common::sha256_hex(url);
        let word_count = raw_text.split_whitespace().count() as i32;

        RawContent {
            id,
            source_id,
            url: url.to_string(),
            source_name: source_name.to_string(),
            title,
            raw_text,
            raw_html: html.to_string(),
            description,
            keywords: extracted_tags.keywords,
            og,
            twitter,
            json_ld,
            author,
            published_date,
            canonical_url,
            article_section,
            crawled_at: Utc::now(),
            word_count,
            classification_status: ClassificationStatus::Pending,
            meta: collect_meta_soup(&document),
        }
    }
}

/// Every `<meta property|name="{prefix}...">` tag reduced to a JSON
/// object keyed by the suffix after the prefix, for reuse with
/// [`normalize_json_ld`] (og:image / twitter:image share the same
/// `{url}`-or-string shape rule as JSON-LD `image`).
fn collect_prefixed_meta(document: &Html, attr: &str, prefix: &str) -> Value {
    let Ok(selector) = Selector::parse(&format!("meta[{attr}]")) else { return Value::Object(Map::new()) };
    let mut map = Map::new();
    for el in document.root_element().select(&selector) {
        let Some(key) = el.value().attr(attr) else { continue };
        let Some(suffix) = key.strip_prefix(prefix) else { continue };
        let Some(content) = el.value().attr("content") else { continue };
        map.insert(suffix.to_string(), Value::String(content.to_string()));
    }
    Value::Object(map)
}

fn collect_meta_soup(document: &Html) -> BTreeMap<String, String> {
    let Ok(selector) = Selector::parse("meta[name], meta[property]") else { return BTreeMap::new() };
    let mut out = BTreeMap::new();
    for el in document.root_element().select(&selector) {
        let key = el.value().attr("name").or_else(|| el.value().attr("property"));
        let Some(key) = key else { continue };
        if key.starts_with("og:") || key.starts_with("twitter:") {
            continue;
        }
        if let Some(content) = el.value().attr("content") {
            out.insert(key.to_string(), content.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_a_minimal_article() {
        let html = r#"<html><head>
            <title>Fallback</title>
            <script type="application/ld+json">{"@type":"NewsArticle","headline":"Real Headline","datePublished":"2024-03-01T12:00:00Z","author":{"name":"Jane Doe"}}</script>
            <meta name="description" content="A description.">
            <meta property="og:image" content="https://example.com/hero.jpg">
        </head><body>
            <article>This is the article body and it is long enough to clear the fixed fallback threshold easily.</article>
        </body></html>"#;

        let content =
            Extractor::extract(html, "https://example.com/a", Uuid::new_v4(), "Example Source", &SourceSelectors::default());
        assert_eq!(content.title, "Real Headline");
        assert_eq!(content.author, Some("Jane Doe".to_string()));
        assert!(content.published_date.is_some());
        assert!(content.raw_text.contains("article body"));
        assert_eq!(content.og.get("image"), Some("https://example.com/hero.jpg"));
        assert_eq!(content.id.len(), 64);
    }
}
