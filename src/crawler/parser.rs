//! Content parsing for fetched pages
//!
//! This module extracts:
//! - Raw link targets from HTML (`<a href>`) and markdown (`[text](url)`, `<url>`)
//! - Visible text from HTML for extractors
//!
//! Raw links are filtered afterwards by `url::filter_links`.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// Elements whose text is never visible
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg", "head"];

/// Extracts raw `href` values from `<a>` tags
///
/// Links carrying a `download` attribute are skipped. Values are returned as
/// written in the document, unresolved.
///
/// # Example
///
/// ```
/// use scrape_bench::crawler::extract_html_links;
///
/// let html = r#"<a href="/about">About</a><a href="/kit.zip" download>Kit</a>"#;
/// assert_eq!(extract_html_links(html), vec!["/about".to_string()]);
/// ```
pub fn extract_html_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .collect()
}

/// Inline links `[text](url "title")` (group 1) and autolinks `<https://...>` (group 2)
static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)|<(https?://[^>\s]+)>"#)
        .expect("Invalid markdown link regex")
});

/// Extracts link targets from markdown inline links and autolinks
pub fn extract_markdown_links(markdown: &str) -> Vec<String> {
    MARKDOWN_LINK
        .captures_iter(markdown)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Collects the visible text of an HTML document
///
/// Text inside scripts, styles and other hidden elements is dropped. The
/// document title, when present, becomes the first line. Each remaining text
/// node becomes one line with inner whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut lines: Vec<String> = Vec::new();

    if let Some(title) = extract_title(&document) {
        lines.push(title);
    }

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if hidden {
            continue;
        }

        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !collapsed.is_empty() {
            lines.push(collapsed);
        }
    }

    lines.join("\n")
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}
