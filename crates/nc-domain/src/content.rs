//! Extracted content: the pre-classification payload and the classified
//! article that results from it, plus JSON-LD normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Classification pipeline status for a [`RawContent`] row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[sqlx(type_name = "classification_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ClassificationStatus {
    Pending,
    Classified,
    Failed,
    Skipped,
}

/// How directly an article relates to the crime/topic domain it was
/// classified against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[sqlx(type_name = "relevance", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Relevance {
    Direct,
    Related,
    Peripheral,
    None,
}

/// Content type a channel rule can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[sqlx(type_name = "content_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Article,
    Video,
    Gallery,
    Other,
}

/// A JSON-LD value after normalization (§4.3): every field the
/// destination store consumes is either a plain string, a number, or
/// absent — never a nested object or heterogeneous array. Stored as a
/// flat string-keyed map rather than arbitrary `serde_json::Value` so
/// downstream consumers get typed accessors instead of re-parsing JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct JsonLdValue(pub BTreeMap<String, String>);

impl JsonLdValue {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// Normalizes a raw JSON-LD object extracted from a page's
/// `<script type="application/ld+json">` block into the flat shape the
/// destination store accepts.
///
/// - `@context`: canonical string — `@vocab` if present, else the first
///   array element, else `"https://schema.org"`.
/// - `image`: a string URL, taken from a plain string, an `{url}`
///   object, or the first array element; dropped if none apply.
/// - `publisher`/`author`: object values are reduced to their `name`.
/// - `mainEntityOfPage`: reduced to `@id` else `url`.
/// - `wordCount`: numeric values are stringified.
/// - every other scalar (string/number/bool) field is kept, stringified.
/// - nested objects/arrays with no rule above are dropped rather than
///   guessed at, since a malformed field here would corrupt indexing.
pub fn normalize_json_ld(raw: &Value) -> JsonLdValue {
    let mut out = BTreeMap::new();
    let Value::Object(map) = raw else {
        return JsonLdValue(out);
    };

    for (key, value) in map {
        let normalized = match key.as_str() {
            "@context" => Some(normalize_context(value)),
            "image" => normalize_image(value),
            "publisher" | "author" => Some(normalize_name_field(value)),
            "mainEntityOfPage" => normalize_main_entity(value),
            "wordCount" => value.as_u64().map(|n| n.to_string()),
            _ => scalar_to_string(value),
        };
        if let Some(normalized) = normalized {
            out.insert(key.clone(), normalized);
        }
    }

    JsonLdValue(out)
}

fn normalize_context(value: &Value) -> String {
    match value {
        Value::Object(obj) => obj
            .get("@vocab")
            .and_then(Value::as_str)
            .unwrap_or("https://schema.org")
            .to_string(),
        Value::Array(arr) => arr
            .iter()
            .find_map(Value::as_str)
            .unwrap_or("https://schema.org")
            .to_string(),
        Value::String(s) => s.clone(),
        _ => "https://schema.org".to_string(),
    }
}

fn normalize_image(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("url").and_then(Value::as_str).map(str::to_string),
        Value::Array(arr) => arr.first().and_then(normalize_image_element),
        _ => None,
    }
}

fn normalize_image_element(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("url").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn normalize_name_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        other => scalar_to_string(other).unwrap_or_default(),
    }
}

fn normalize_main_entity(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj
            .get("@id")
            .or_else(|| obj.get("url"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Extracted payload before classification.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct RawContent {
    /// `hex(SHA256(url))` when no id is available in the source DOM.
    pub id: String,
    pub url: String,
    /// The crawl target this page was fetched for — needed by the router
    /// to look up `Route(source_id, channel_id)` gating (§4.5), since
    /// `source_name` alone isn't a stable join key.
    pub source_id: Uuid,
    pub source_name: String,
    pub title: String,
    pub raw_text: String,
    pub raw_html: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    #[sqlx(json)]
    pub og: JsonLdValue,
    #[sqlx(json)]
    pub twitter: JsonLdValue,
    #[sqlx(json)]
    pub json_ld: JsonLdValue,
    pub author: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub canonical_url: Option<String>,
    pub article_section: Option<String>,
    pub crawled_at: DateTime<Utc>,
    pub word_count: i32,
    pub classification_status: ClassificationStatus,
    #[sqlx(json)]
    pub meta: BTreeMap<String, String>,
}

/// A [`RawContent`] that has passed classification.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct Article {
    #[sqlx(flatten)]
    pub raw: RawContent,
    pub topic_tags: Vec<String>,
    pub quality_score: i16,
    pub crime_sub_type: Option<String>,
    pub relevance: Relevance,
    pub review_required: bool,
    pub category: Option<String>,
    pub section: Option<String>,
    pub tags: Vec<String>,
    pub intro: Option<String>,
    pub byline: Option<String>,
}

impl Article {
    pub fn passes_quality_floor(&self, min_quality_score: i16) -> bool {
        self.quality_score >= min_quality_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn context_prefers_vocab_then_array_then_default() {
        assert_eq!(
            normalize_context(&json!({"@vocab": "https://example.com/"})),
            "https://example.com/"
        );
        assert_eq!(
            normalize_context(&json!(["https://schema.org", "https://example.com"])),
            "https://schema.org"
        );
        assert_eq!(normalize_context(&json!(42)), "https://schema.org");
    }

    #[test]
    fn image_extracted_from_all_shapes() {
        assert_eq!(normalize_image(&json!("https://e.com/a.jpg")), Some("https://e.com/a.jpg".to_string()));
        assert_eq!(normalize_image(&json!({"url": "https://e.com/b.jpg"})), Some("https://e.com/b.jpg".to_string()));
        assert_eq!(
            normalize_image(&json!([{"url": "https://e.com/c.jpg"}, "ignored"])),
            Some("https://e.com/c.jpg".to_string())
        );
        assert_eq!(normalize_image(&json!({"other": "field"})), None);
    }

    #[test]
    fn publisher_and_author_reduce_object_to_name() {
        assert_eq!(normalize_name_field(&json!({"name": "Example News", "@type": "Organization"})), "Example News");
        assert_eq!(normalize_name_field(&json!("Example News")), "Example News");
    }

    #[test]
    fn main_entity_of_page_prefers_id_over_url() {
        assert_eq!(
            normalize_main_entity(&json!({"@id": "https://e.com/a", "url": "https://e.com/b"})),
            Some("https://e.com/a".to_string())
        );
        assert_eq!(normalize_main_entity(&json!({"url": "https://e.com/b"})), Some("https://e.com/b".to_string()));
    }

    #[test]
    fn word_count_is_stringified() {
        let normalized = normalize_json_ld(&json!({"wordCount": 512}));
        assert_eq!(normalized.get("wordCount"), Some("512"));
    }

    #[test]
    fn unhandled_nested_objects_are_dropped() {
        let normalized = normalize_json_ld(&json!({"locationCreated": {"@type": "Place", "name": "City"}}));
        assert!(normalized.get("locationCreated").is_none());
    }

    #[test]
    fn full_article_jsonld_normalizes_every_rule_at_once() {
        let normalized = normalize_json_ld(&json!({
            "@context": ["https://schema.org"],
            "@type": "NewsArticle",
            "headline": "Example headline",
            "image": {"url": "https://e.com/hero.jpg"},
            "publisher": {"@type": "Organization", "name": "Example News"},
            "author": {"@type": "Person", "name": "Jane Doe"},
            "mainEntityOfPage": {"@id": "https://e.com/story"},
            "wordCount": 734,
        }));
        assert_eq!(normalized.get("@context"), Some("https://schema.org"));
        assert_eq!(normalized.get("image"), Some("https://e.com/hero.jpg"));
        assert_eq!(normalized.get("publisher"), Some("Example News"));
        assert_eq!(normalized.get("author"), Some("Jane Doe"));
        assert_eq!(normalized.get("mainEntityOfPage"), Some("https://e.com/story"));
        assert_eq!(normalized.get("wordCount"), Some("734"));
        assert_eq!(normalized.get("headline"), Some("Example headline"));
    }
}
