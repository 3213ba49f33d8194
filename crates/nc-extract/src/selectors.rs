//! Primitive selector-driven extraction operations (§4.3). Every higher
//! chain (title/body/date/author/tags) is built out of these five:
//! `extract_text`, `extract_text_from_container`, `extract_attr`,
//! `extract_meta`, `extract_meta_name`.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Node, Selector};

/// Splits a comma-separated selector list, trimming each part and
/// dropping empty entries. Selectors are tried in this order, not
/// merged into a single compound CSS group (a group selector match
/// order is document order, not selector-list order).
pub(crate) fn split_selectors(csv: &str) -> Vec<String> {
    csv.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn parse_selector(raw: &str) -> Option<Selector> {
    Selector::parse(raw).ok()
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tries `selector_csv` entries in order; for each, first a direct-child
/// match (`:scope > selector`), then a full descendant match. Returns the
/// first non-empty trimmed text.
pub fn extract_text(document: &Html, selector_csv: &str) -> Option<String> {
    extract_text_from(document.root_element(), selector_csv)
}

/// Same as [`extract_text`] but scoped to `scope` rather than the whole
/// document (used when a container has already been located).
pub fn extract_text_from(scope: ElementRef, selector_csv: &str) -> Option<String> {
    for raw in split_selectors(selector_csv) {
        if let Some(scoped) = parse_selector(&format!(":scope > {raw}")) {
            if let Some(found) = scope.select(&scoped).next() {
                let text = text_of(found);
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
        if let Some(descendant) = parse_selector(&raw) {
            if let Some(found) = scope.select(&descendant).next() {
                let text = text_of(found);
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}

/// Locates the first element matching any of `container_csv`'s
/// selectors (searched anywhere in the document), strips every subtree
/// matching `excludes_csv`, then returns the remaining subtree's text.
pub fn extract_text_from_container(document: &Html, container_csv: &str, excludes_csv: &str) -> Option<String> {
    let container = split_selectors(container_csv)
        .iter()
        .filter_map(|s| parse_selector(s))
        .find_map(|sel| document.root_element().select(&sel).next())?;

    let excludes: Vec<Selector> = split_selectors(excludes_csv).iter().filter_map(|s| parse_selector(s)).collect();
    let excluded_ids: HashSet<_> = excludes.iter().flat_map(|sel| container.select(sel)).map(|el| el.id()).collect();

    let mut buf = String::new();
    for node in container.descendants() {
        if let Node::Text(text) = node.value() {
            let under_excluded = node.ancestors().any(|ancestor| excluded_ids.contains(&ancestor.id()));
            if !under_excluded {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    buf.push_str(trimmed);
                    buf.push(' ');
                }
            }
        }
    }
    let result = buf.trim().to_string();
    if result.is_empty() {
        None
    } else {
        Some(result)
    }
}

/// First element matching any of `selector_csv`'s selectors, returning
/// the named attribute's value.
pub fn extract_attr(document: &Html, selector_csv: &str, attr: &str) -> Option<String> {
    split_selectors(selector_csv)
        .iter()
        .filter_map(|s| parse_selector(s))
        .find_map(|sel| document.root_element().select(&sel).next())
        .and_then(|el| el.value().attr(attr))
        .map(str::to_string)
}

/// `<meta property="{property}" content="...">`.
pub fn extract_meta(document: &Html, property: &str) -> Option<String> {
    let selector = parse_selector(&format!("meta[property=\"{property}\"]"))?;
    document.root_element().select(&selector).next().and_then(|el| el.value().attr("content")).map(str::to_string)
}

/// `<meta name="{name}" content="...">`.
pub fn extract_meta_name(document: &Html, name: &str) -> Option<String> {
    let selector = parse_selector(&format!("meta[name=\"{name}\"]"))?;
    document.root_element().select(&selector).next().and_then(|el| el.value().attr("content")).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn extract_text_prefers_direct_child_over_descendant() {
        let d = doc("<html><body><div class='c'><h1>Outer</h1><span><h1>Inner</h1></span></div></body></html>");
        assert_eq!(extract_text(&d, "h1"), Some("Outer".to_string()));
    }

    #[test]
    fn extract_text_falls_through_comma_list() {
        let d = doc("<html><body><h2 class='b'>Second</h2></body></html>");
        assert_eq!(extract_text(&d, "h1.a, h2.b"), Some("Second".to_string()));
    }

    #[test]
    fn container_strips_excluded_subtrees() {
        let d = doc(
            "<html><body><article>Lead paragraph. <aside class='ad'>Buy now!</aside> Trailing text.</article></body></html>",
        );
        let text = extract_text_from_container(&d, "article", ".ad").unwrap();
        assert!(text.contains("Lead paragraph"));
        assert!(text.contains("Trailing text"));
        assert!(!text.contains("Buy now"));
    }

    #[test]
    fn meta_property_and_name_are_distinct() {
        let d = doc(
            "<html><head><meta property=\"og:title\" content=\"OG Title\"><meta name=\"keywords\" content=\"a,b\"></head></html>",
        );
        assert_eq!(extract_meta(&d, "og:title"), Some("OG Title".to_string()));
        assert_eq!(extract_meta_name(&d, "keywords"), Some("a,b".to_string()));
    }

    #[test]
    fn extract_attr_reads_named_attribute() {
        let d = doc("<html><body><time datetime=\"2024-01-02T03:04:05Z\">Jan 2</time></body></html>");
        assert_eq!(extract_attr(&d, "time", "datetime"), Some("2024-01-02T03:04:05Z".to_string()));
    }
}
