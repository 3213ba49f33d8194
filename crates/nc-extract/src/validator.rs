//! Validator (§4.4): rejects an article with a reason string, no
//! partial writes. Each rejection reason has its own counter so the
//! admin API's stats surface can show a breakdown.

use chrono::{DateTime, Utc};
use nc_domain::RawContent;
use regex::Regex;
use std::sync::OnceLock;

const GENERIC_TITLES: &[&str] = &[
    "latest headlines",
    "latest news",
    "news archive",
    "headlines",
    "news",
    "articles",
    "all articles",
    "category",
    "tag",
    "archive",
];

const CATEGORY_PATH_MARKERS: &[&str] =
    &["/category/", "/tag/", "/page/", "/author/", "/archive/", "/feed/", "/rss/", "/search/", "?page="];

const SNIPPET_MARKERS: &[&str] = &["read more", "continue reading", "full story", "view article"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    CategoryPage,
    ContentQuality,
    InvalidDate,
    ContentLength,
    TitleQuality,
    WordCount,
}

impl RejectionReason {
    pub fn counter_name(&self) -> &'static str {
        match self {
            RejectionReason::CategoryPage => "category-page",
            RejectionReason::ContentQuality => "content-quality",
            RejectionReason::InvalidDate => "invalid-date",
            RejectionReason::ContentLength => "content-quality",
            RejectionReason::TitleQuality => "title-quality",
            RejectionReason::WordCount => "word-count",
        }
    }
}

pub struct Validator;

impl Validator {
    /// Runs every rule; returns the first failure, if any.
    pub fn validate(content: &RawContent) -> Result<(), RejectionReason> {
        if Self::is_category_page(&content.url, &content.title) {
            metrics::counter!("extract.rejections.category_page_total").increment(1);
            return Err(RejectionReason::CategoryPage);
        }
        if Self::has_concatenated_snippets(&content.raw_text) || content.description.as_deref().is_some_and(Self::has_concatenated_snippets) {
            metrics::counter!("extract.rejections.content_quality_total").increment(1);
            return Err(RejectionReason::ContentQuality);
        }
        if !Self::published_date_in_range(content.published_date) {
            metrics::counter!("extract.rejections.invalid_date_total").increment(1);
            return Err(RejectionReason::InvalidDate);
        }
        let body_len = content.raw_text.chars().count();
        if !(100..=100_000).contains(&body_len) {
            metrics::counter!("extract.rejections.content_quality_total").increment(1);
            return Err(RejectionReason::ContentLength);
        }
        if content.title.trim().is_empty() || Self::is_generic_title(&content.title) {
            metrics::counter!("extract.rejections.title_quality_total").increment(1);
            return Err(RejectionReason::TitleQuality);
        }
        if Self::word_count(&content.raw_text) < 50 {
            metrics::counter!("extract.rejections.word_count_total").increment(1);
            return Err(RejectionReason::WordCount);
        }
        Ok(())
    }

    fn is_generic_title(title: &str) -> bool {
        let lower = title.trim().to_lowercase();
        GENERIC_TITLES.iter().any(|generic| {
            lower == *generic || lower.starts_with(&format!("{generic} |")) || lower.ends_with(&format!("| {generic}"))
        })
    }

    fn is_category_page(url: &str, title: &str) -> bool {
        let path = url_path(url);
        if CATEGORY_PATH_MARKERS.iter().any(|marker| path.contains(marker) || url.contains(marker)) {
            return true;
        }
        if path.ends_with('/') && path != "/" {
            return true;
        }
        Self::is_generic_title(title)
    }

    fn has_concatenated_snippets(text: &str) -> bool {
        if text.chars().count() < 200 {
            return false;
        }
        let lower = text.to_lowercase();
        let snippet_hits = SNIPPET_MARKERS.iter().map(|m| lower.matches(m).count()).sum::<usize>();
        if snippet_hits >= 3 {
            return true;
        }
        headline_like_line_regex().find_iter(text).filter(|m| is_headline_like(m.as_str())).count() >= 5
    }

    fn published_date_in_range(date: Option<DateTime<Utc>>) -> bool {
        match date {
            None => false,
            Some(d) => {
                let min = DateTime::parse_from_rfc3339("2000-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
                d >= min && d <= Utc::now() + chrono::Duration::days(1)
            }
        }
    }

    fn word_count(text: &str) -> usize {
        text.split_whitespace().count()
    }
}

fn url_path(url: &str) -> String {
    url::Url::parse(url).map(|u| u.path().to_string()).unwrap_or_else(|_| url.to_string())
}

fn headline_like_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^.?!\n]+[.?!]").expect("static regex is valid"))
}

fn is_headline_like(line: &str) -> bool {
    let trimmed = line.trim();
    let len = trimmed.chars().count();
    if !(20..=100).contains(&len) {
        return false;
    }
    if !trimmed.ends_with(['.', '?', '!']) {
        return false;
    }
    let word_count = trimmed.split_whitespace().count();
    (3..=15).contains(&word_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nc_domain::ClassificationStatus;

    fn sample(url: &str, title: &str, body: &str, published: Option<DateTime<Utc>>) -> RawContent {
        RawContent {
            id: "id".to_string(),
            source_id: uuid::Uuid::new_v4(),
            url: url.to_string(),
            source_name: "Test".to_string(),
            title: title.to_string(),
            raw_text: body.to_string(),
            raw_html: String::new(),
            description: None,
            keywords: vec![],
            og: Default::default(),
            twitter: Default::default(),
            json_ld: Default::default(),
            author: None,
            published_date: published,
            canonical_url: None,
            article_section: None,
            crawled_at: Utc::now(),
            word_count: body.split_whitespace().count() as i32,
            classification_status: ClassificationStatus::Pending,
            meta: Default::default(),
        }
    }

    fn long_body(words: usize) -> String {
        (0..words).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn category_page_url_is_rejected() {
        let content = sample("https://example.com/category/crime", "Headlines", &long_body(60), Some(Utc::now()));
        assert_eq!(Validator::validate(&content), Err(RejectionReason::CategoryPage));
    }

    #[test]
    fn generic_title_is_rejected() {
        let content = sample("https://example.com/a", "Latest Headlines", &long_body(60), Some(Utc::now()));
        assert_eq!(Validator::validate(&content), Err(RejectionReason::CategoryPage));
    }

    #[test]
    fn missing_published_date_is_rejected() {
        let content = sample("https://example.com/a", "Real Story Title", &long_body(60), None);
        assert_eq!(Validator::validate(&content), Err(RejectionReason::InvalidDate));
    }

    #[test]
    fn short_body_is_rejected_on_word_count() {
        let content = sample("https://example.com/a", "Real Story Title", "too short here", Some(Utc::now()));
        assert_eq!(Validator::validate(&content), Err(RejectionReason::ContentLength));
    }

    #[test]
    fn well_formed_article_passes() {
        let content = sample("https://example.com/a", "Real Story Title About Something", &long_body(60), Some(Utc::now()));
        assert_eq!(Validator::validate(&content), Ok(()));
    }
}
