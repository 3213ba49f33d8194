//! Published-date chain (§4.3). Candidates are tried in priority order;
//! each candidate string is parsed against a fixed format list and the
//! first successful parse (candidate, format) pair wins.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use scraper::Html;
use serde_json::Value;

use crate::jsonld;
use crate::selectors::{extract_attr, extract_meta, extract_meta_name, extract_text};

/// Named timezone abbreviations this list's Go-style formats reference
/// (`MST`, `UTC`, ...) that chrono can't parse generically; stripped
/// before a naive (zone-less, assumed-UTC) parse attempt.
const KNOWN_ZONE_ABBREVIATIONS: &[&str] = &["UTC", "GMT", "MST", "EST", "EDT", "CST", "CDT", "PST", "PDT", "Z"];

fn strip_trailing_zone_abbr(s: &str) -> &str {
    let trimmed = s.trim_end();
    for abbr in KNOWN_ZONE_ABBREVIATIONS {
        if let Some(stripped) = trimmed.strip_suffix(abbr) {
            if stripped.ends_with(' ') {
                return stripped.trim_end();
            }
        }
    }
    trimmed
}

pub fn parse_date(candidate: &str) -> Option<DateTime<Utc>> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }

    // RFC3339.
    if let Ok(dt) = DateTime::parse_from_rfc3339(candidate) {
        return Some(dt.with_timezone(&Utc));
    }
    // RFC1123Z, RFC822Z, RubyDate-style — all carry a numeric offset,
    // which `parse_from_rfc2822` and a couple of explicit formats cover.
    if let Ok(dt) = DateTime::parse_from_rfc2822(candidate) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%a, %d %b %Y %H:%M:%S %z", "%d %b %y %H:%M %z", "%a %b %d %H:%M:%S %z %Y"] {
        if let Ok(dt) = DateTime::parse_from_str(candidate, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    // Named-zone variants (RFC1123, RFC822, RFC850, ANSIC, UnixDate):
    // strip the abbreviation and parse naively, assuming UTC.
    let stripped = strip_trailing_zone_abbr(candidate);
    for fmt in [
        "%a, %d %b %Y %H:%M:%S",
        "%d %b %y %H:%M",
        "%A, %d-%b-%y %H:%M:%S",
        "%a %b %e %H:%M:%S %Y",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(stripped, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(candidate, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(candidate, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Some(Utc.from_utc_datetime(&midnight));
        }
    }

    None
}

pub fn extract_published_date(document: &Html, published_time_selector: Option<&str>) -> Option<DateTime<Utc>> {
    if let Some(article) = jsonld::find_article(document) {
        for key in ["datePublished", "publishedDate", "date"] {
            if let Some(candidate) = article.get(key).and_then(Value::as_str) {
                if let Some(dt) = parse_date(candidate) {
                    return Some(dt);
                }
            }
        }
    }

    if let Some(candidate) = extract_attr(document, "[itemprop='datePublished']", "content")
        .or_else(|| extract_attr(document, "[itemprop='datePublished']", "datetime"))
        .or_else(|| extract_text(document, "[itemprop='datePublished']"))
    {
        if let Some(dt) = parse_date(&candidate) {
            return Some(dt);
        }
    }

    if let Some(selector) = published_time_selector {
        if let Some(candidate) = extract_attr(document, selector, "datetime").or_else(|| extract_text(document, selector)) {
            if let Some(dt) = parse_date(&candidate) {
                return Some(dt);
            }
        }
    }

    if let Some(candidate) = extract_meta(document, "article:published_time") {
        if let Some(dt) = parse_date(&candidate) {
            return Some(dt);
        }
    }

    for name in ["date", "publishdate", "pubdate"] {
        if let Some(candidate) = extract_meta_name(document, name) {
            if let Some(dt) = parse_date(&candidate) {
                return Some(dt);
            }
        }
    }

    if let Some(candidate) = extract_attr(document, "time[datetime]", "datetime") {
        if let Some(dt) = parse_date(&candidate) {
            return Some(dt);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_parses() {
        assert!(parse_date("2024-03-15T10:30:00Z").is_some());
    }

    #[test]
    fn rfc1123_with_named_zone_parses() {
        assert!(parse_date("Mon, 02 Jan 2006 15:04:05 MST").is_some());
    }

    #[test]
    fn date_only_parses_as_midnight_utc() {
        let dt = parse_date("2024-03-15").unwrap();
        assert_eq!(dt.format("%H:%M:%S").to_string(), "00:00:00");
    }

    #[test]
    fn garbage_does_not_parse() {
        assert!(parse_date("not a date").is_none());
    }

    #[test]
    fn chain_prefers_json_ld_over_meta() {
        let d = Html::parse_document(
            "<html><head><script type=\"application/ld+json\">{\"@type\":\"Article\",\"datePublished\":\"2024-01-01T00:00:00Z\"}</script><meta name=\"pubdate\" content=\"2024-06-01\"></head></html>",
        );
        let dt = extract_published_date(&d, None).unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-01-01");
    }
}
