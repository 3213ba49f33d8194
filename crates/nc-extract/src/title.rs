//! Title chain (§4.3): JSON-LD `headline` → `og:title` → `<title>` → `<h1>`.

use scraper::Html;
use serde_json::Value;

use crate::jsonld;
use crate::selectors::{extract_meta, extract_text};

pub fn extract_title(document: &Html, title_selector: Option<&str>) -> Option<String> {
    if let Some(headline) = jsonld::find_article(document).and_then(|a| a.get("headline").and_then(Value::as_str).map(str::to_string)) {
        if !headline.trim().is_empty() {
            return Some(headline.trim().to_string());
        }
    }
    if let Some(selector) = title_selector {
        if let Some(text) = extract_text(document, selector) {
            return Some(text);
        }
    }
    if let Some(og) = extract_meta(document, "og:title") {
        if !og.trim().is_empty() {
            return Some(og.trim().to_string());
        }
    }
    if let Some(text) = extract_text(document, "title") {
        return Some(text);
    }
    extract_text(document, "h1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_ld_headline_wins_over_everything() {
        let d = Html::parse_document(
            "<html><head><title>Fallback Title</title><script type=\"application/ld+json\">{\"@type\":\"Article\",\"headline\":\"LD Headline\"}</script><meta property=\"og:title\" content=\"OG Title\"></head></html>",
        );
        assert_eq!(extract_title(&d, None), Some("LD Headline".to_string()));
    }

    #[test]
    fn falls_back_through_og_then_title_tag_then_h1() {
        let og = Html::parse_document("<html><head><meta property=\"og:title\" content=\"OG Title\"></head></html>");
        assert_eq!(extract_title(&og, None), Some("OG Title".to_string()));

        let title_tag = Html::parse_document("<html><head><title>Page Title</title></head></html>");
        assert_eq!(extract_title(&title_tag, None), Some("Page Title".to_string()));

        let h1 = Html::parse_document("<html><body><h1>Heading Title</h1></body></html>");
        assert_eq!(extract_title(&h1, None), Some("Heading Title".to_string()));
    }
}
