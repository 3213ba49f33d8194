//! Locates `<script type="application/ld+json">` blocks and picks out
//! the one describing the article itself (§4.3's title/date/author
//! chains all start here).

use scraper::{Html, Selector};
use serde_json::Value;

const ARTICLE_TYPES: &[&str] = &["article", "newsarticle", "blogposting"];

fn script_selector() -> Selector {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("static selector is valid")
}

/// All JSON-LD blocks on the page, flattened out of `@graph` wrappers and
/// top-level arrays, in document order.
pub fn all_json_ld(document: &Html) -> Vec<Value> {
    let selector = script_selector();
    let mut out = Vec::new();
    for script in document.root_element().select(&selector) {
        let text = script.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(text.trim()) else { continue };
        flatten_into(value, &mut out);
    }
    out
}

fn flatten_into(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|v| flatten_into(v, out)),
        Value::Object(ref map) if map.contains_key("@graph") => {
            if let Some(Value::Array(items)) = map.get("@graph").cloned() {
                items.into_iter().for_each(|v| flatten_into(v, out));
            }
        }
        other => out.push(other),
    }
}

fn type_matches(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => ARTICLE_TYPES.contains(&t.to_lowercase().as_str()),
        Some(Value::Array(types)) => {
            types.iter().filter_map(Value::as_str).any(|t| ARTICLE_TYPES.contains(&t.to_lowercase().as_str()))
        }
        _ => false,
    }
}

/// The first JSON-LD block whose `@type` is Article/NewsArticle/
/// BlogPosting, if any.
pub fn find_article(document: &Html) -> Option<Value> {
    all_json_ld(document).into_iter().find(type_matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc_with_ld(body: &str) -> Html {
        Html::parse_document(&format!(
            "<html><head><script type=\"application/ld+json\">{body}</script></head></html>"
        ))
    }

    #[test]
    fn finds_news_article_type() {
        let d = doc_with_ld(&json!({"@type": "NewsArticle", "headline": "Hello"}).to_string());
        let found = find_article(&d).unwrap();
        assert_eq!(found.get("headline").and_then(Value::as_str), Some("Hello"));
    }

    #[test]
    fn flattens_graph_wrapper() {
        let d = doc_with_ld(
            &json!({"@graph": [{"@type": "Organization", "name": "Pub"}, {"@type": "Article", "headline": "From graph"}]})
                .to_string(),
        );
        let found = find_article(&d).unwrap();
        assert_eq!(found.get("headline").and_then(Value::as_str), Some("From graph"));
    }

    #[test]
    fn ignores_non_article_types() {
        let d = doc_with_ld(&json!({"@type": "Organization", "name": "Pub"}).to_string());
        assert!(find_article(&d).is_none());
    }
}
