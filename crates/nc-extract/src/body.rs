//! Body chain (§4.3): seven ordered strategies, stopping at the first
//! whose trimmed length clears its strategy's acceptance threshold.

use scraper::{Html, Selector};

use crate::selectors::{extract_text_from_container, split_selectors};

const FALLBACK_CONTAINERS: &str =
    "article, main, .article-content, .post-content, .entry-content, [role='article'], .story-body";
const HEURISTIC_CONTAINERS: &str = "article, main, [role='article'], .content, .post-content";
const HEURISTIC_PARAGRAPH_SCOPES: &[&str] = &["article p", "main p", ".content p"];
const STRIP_SELECTOR: &str =
    "header, footer, nav, aside, .header, .footer, .navigation, .sidebar, .menu, script, style";
const NAV_BOILERPLATE_PREFIXES: &[&str] = &["home", "about", "contact"];

pub fn extract_body(document: &Html, container_selector: Option<&str>, body_selector: Option<&str>, excludes: &str, paragraph_selector: Option<&str>) -> String {
    // 1 & 2: configured container / body selector, excludes applied.
    if let Some(container) = container_selector {
        if let Some(text) = extract_text_from_container(document, container, excludes) {
            if !text.trim().is_empty() {
                return text;
            }
        }
    }
    if let Some(body_sel) = body_selector {
        if let Some(text) = extract_text_from_container(document, body_sel, excludes) {
            if !text.trim().is_empty() {
                return text;
            }
        }
    }

    // 3: fixed fallback container list.
    if let Some(text) = extract_text_from_container(document, FALLBACK_CONTAINERS, excludes) {
        if text.trim().len() > 50 {
            return text;
        }
    }

    // 4: full-document heuristic strategies.
    if let Some(text) = extract_text_from_container(document, HEURISTIC_CONTAINERS, excludes) {
        if text.trim().len() > 100 {
            return text;
        }
    }
    for scope in HEURISTIC_PARAGRAPH_SCOPES {
        if let Some(text) = paragraph_join(document, scope) {
            if text.trim().len() > 100 {
                return text;
            }
        }
    }

    // 5: aggressive paragraph collection.
    if let Some(selector) = paragraph_selector {
        if let Some(text) = aggressive_paragraphs(document, selector, 20) {
            if text.len() > 100 {
                return text;
            }
        }
    }

    // 6: last resort, strip boilerplate from <body>, keep substantial
    // non-navigational paragraphs.
    if let Some(text) = last_resort_body(document) {
        return text;
    }

    // 7: readability-style fallback, absolute last resort.
    readability_fallback(document)
}

fn paragraph_join(document: &Html, selector_csv: &str) -> Option<String> {
    let selector = split_selectors(selector_csv).into_iter().find_map(|s| Selector::parse(&s).ok())?;
    let joined = document
        .root_element()
        .select(&selector)
        .map(|p| p.text().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    if joined.trim().is_empty() {
        None
    } else {
        Some(joined)
    }
}

fn aggressive_paragraphs(document: &Html, selector_csv: &str, min_len: usize) -> Option<String> {
    let selector = split_selectors(selector_csv).into_iter().find_map(|s| Selector::parse(&s).ok())?;
    let paragraphs: Vec<String> = document
        .root_element()
        .select(&selector)
        .map(|p| p.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .filter(|t| t.chars().count() > min_len)
        .collect();
    if paragraphs.is_empty() {
        None
    } else {
        Some(paragraphs.join("\n\n"))
    }
}

fn last_resort_body(document: &Html) -> Option<String> {
    let body_selector = Selector::parse("body").ok()?;
    let strip_selector = Selector::parse(STRIP_SELECTOR).ok()?;
    let p_selector = Selector::parse("p").ok()?;
    let body = document.root_element().select(&body_selector).next()?;

    let stripped_ids: std::collections::HashSet<_> = body.select(&strip_selector).map(|el| el.id()).collect();

    let paragraphs: Vec<String> = body
        .select(&p_selector)
        .filter(|p| !p.ancestors().any(|a| stripped_ids.contains(&a.id())))
        .map(|p| p.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .filter(|t| t.chars().count() > 30)
        .filter(|t| {
            let lower = t.to_lowercase();
            !NAV_BOILERPLATE_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
        })
        .collect();

    if paragraphs.len() >= 3 {
        Some(paragraphs.join("\n\n"))
    } else {
        None
    }
}

/// A small readability-style heuristic: score block candidates by the
/// total length of their direct paragraph text and return the winner's
/// text. This is the absolute last resort when nothing else qualified.
fn readability_fallback(document: &Html) -> String {
    let candidate_selector = match Selector::parse("div, section, article, main") {
        Ok(s) => s,
        Err(_) => return String::new(),
    };
    let p_selector = match Selector::parse("p") {
        Ok(s) => s,
        Err(_) => return String::new(),
    };

    let mut best_text = String::new();
    let mut best_score = 0usize;
    for candidate in document.root_element().select(&candidate_selector) {
        let text = candidate
            .select(&p_selector)
            .map(|p| p.text().collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join("\n\n");
        let score = text.chars().count();
        if score > best_score {
            best_score = score;
            best_text = text;
        }
    }
    best_text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_container_wins_when_present() {
        let d = Html::parse_document(
            "<html><body><div class='main-body'>Configured body text that is definitely long enough to pass every threshold in this chain.</div></body></html>",
        );
        let body = extract_body(&d, Some(".main-body"), None, "", None);
        assert!(body.contains("Configured body text"));
    }

    #[test]
    fn falls_back_to_fixed_container_list() {
        let d = Html::parse_document(
            "<html><body><article>This article element has no configured selector but is on the fixed fallback list and long enough.</article></body></html>",
        );
        let body = extract_body(&d, None, None, "", None);
        assert!(body.contains("fixed fallback list"));
    }

    #[test]
    fn last_resort_requires_three_substantial_paragraphs() {
        let d = Html::parse_document(
            "<html><body><nav><p>Home</p></nav><p>First substantial paragraph well past thirty characters.</p><p>Second substantial paragraph well past thirty characters.</p><p>Third substantial paragraph well past thirty characters.</p></body></html>",
        );
        let body = extract_body(&d, None, None, "", None);
        assert!(body.contains("First substantial"));
        assert!(!body.contains("Home"));
    }
}
