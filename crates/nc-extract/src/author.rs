//! Author chain (§4.3): author selector → `article:author` meta →
//! rel=author link → byline selector → JSON-LD `author`.

use scraper::Html;
use serde_json::Value;

use crate::jsonld;
use crate::selectors::{extract_meta, extract_text};

pub fn extract_author(document: &Html, author_selector: Option<&str>, byline_selector: Option<&str>) -> Option<String> {
    if let Some(selector) = author_selector {
        if let Some(text) = extract_text(document, selector) {
            return Some(text);
        }
    }
    if let Some(meta) = extract_meta(document, "article:author") {
        if !meta.trim().is_empty() {
            return Some(meta.trim().to_string());
        }
    }
    if let Some(text) = extract_text(document, "a[rel='author']") {
        return Some(text);
    }
    if let Some(selector) = byline_selector {
        if let Some(text) = extract_text(document, selector) {
            return Some(text);
        }
    }
    jsonld::find_article(document).and_then(|article| match article.get("author") {
        Some(Value::String(name)) => Some(name.clone()),
        Some(Value::Object(obj)) => obj.get("name").and_then(Value::as_str).map(str::to_string),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_json_ld_author_object() {
        let d = Html::parse_document(
            "<html><head><script type=\"application/ld+json\">{\"@type\":\"Article\",\"author\":{\"name\":\"Jane Doe\"}}</script></head></html>",
        );
        assert_eq!(extract_author(&d, None, None), Some("Jane Doe".to_string()));
    }

    #[test]
    fn rel_author_link_wins_over_json_ld() {
        let d = Html::parse_document(
            "<html><body><a rel=\"author\">John Smith</a><script type=\"application/ld+json\">{\"@type\":\"Article\",\"author\":\"Ignored\"}</script></body></html>",
        );
        assert_eq!(extract_author(&d, None, None), Some("John Smith".to_string()));
    }
}
