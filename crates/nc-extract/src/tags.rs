//! Keywords/tags extraction (§4.3): keywords populate both `keywords`
//! and `tags`; a separate tags selector is merged in with case-
//! preserving, first-seen dedup against the keyword set.

use std::collections::HashSet;

use scraper::Html;

use crate::selectors::{extract_meta_name, extract_text};

fn split_comma_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn dedup_case_preserving(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if seen.insert(item.to_lowercase()) {
            out.push(item);
        }
    }
    out
}

pub struct ExtractedTags {
    pub keywords: Vec<String>,
    pub tags: Vec<String>,
}

pub fn extract_tags(document: &Html, keywords_selector: Option<&str>, tags_selector: Option<&str>) -> ExtractedTags {
    let keyword_text = keywords_selector
        .and_then(|selector| extract_text(document, selector))
        .or_else(|| extract_meta_name(document, "keywords"));
    let keywords = keyword_text.map(|t| split_comma_list(&t)).unwrap_or_default();

    let tag_candidates = tags_selector.and_then(|selector| extract_text(document, selector)).map(|t| split_comma_list(&t)).unwrap_or_default();

    let merged = keywords.iter().cloned().chain(tag_candidates);
    let tags = dedup_case_preserving(merged);

    ExtractedTags { keywords, tags }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_meta_falls_back_when_no_selector() {
        let d = Html::parse_document("<html><head><meta name=\"keywords\" content=\"Crime, Politics, crime\"></head></html>");
        let extracted = extract_tags(&d, None, None);
        assert_eq!(extracted.keywords, vec!["Crime", "Politics", "crime"]);
        assert_eq!(extracted.tags, vec!["Crime", "Politics"]);
    }

    #[test]
    fn tags_selector_merges_with_dedup() {
        let d = Html::parse_document(
            "<html><head><meta name=\"keywords\" content=\"Crime\"></head><body><div class='tags'>Crime, Local News</div></body></html>",
        );
        let extracted = extract_tags(&d, None, Some(".tags"));
        assert_eq!(extracted.keywords, vec!["Crime"]);
        assert_eq!(extracted.tags, vec!["Crime", "Local News"]);
    }
}
