//! Page set to extractor input text

use crate::crawler::PageSet;
use regex::Regex;
use std::sync::LazyLock;

/// Characters kept per page
pub const MAX_CHARS_PER_PAGE: usize = 25_000;

/// Characters kept for the combined content
pub const MAX_TOTAL_CHARS: usize = 200_000;

pub const TRUNCATION_MARKER: &str = "[...truncated]";

const PAGE_SEPARATOR: &str = "\n\n---\n\n";

static LINKED_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\s*!\[[^\]]*\]\([^)]+\)\s*\]\([^)]+\)").expect("Invalid linked image regex")
});

static INLINE_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]+\)").expect("Invalid inline image regex"));

static BASE64_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"data:image/[^;]+;base64,[A-Za-z0-9+/=]{100,}").expect("Invalid data URI regex")
});

static CONSENT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^.*(we use cookies|cookie policy|accept all|reject all|manage preferences).*$")
        .expect("Invalid consent regex")
});

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("Invalid blank line regex"));

/// Strips images, inline data URIs and consent banners, and collapses blank lines
pub fn clean_page(text: &str) -> String {
    let text = LINKED_IMAGE.replace_all(text, "");
    let text = INLINE_IMAGE.replace_all(&text, "");
    let text = BASE64_URI.replace_all(&text, "[base64-image]");
    let text = CONSENT_LINE.replace_all(&text, "");

    let trimmed: Vec<&str> = text.lines().map(str::trim).collect();
    let joined = trimmed.join("\n");
    BLANK_RUNS.replace_all(&joined, "\n\n").trim().to_string()
}

/// Cuts `text` to at most `max_chars` characters, appending the marker when cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}\n\n{}", &text[..idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Combines every non-blank page into one document
///
/// Each page becomes a `## Page: <name>` section; sections are separated by
/// `---`.
pub fn prepare_content(pages: &PageSet) -> String {
    let sections: Vec<String> = pages
        .pages
        .iter()
        .filter_map(|page| {
            let cleaned = clean_page(&page.content);
            if cleaned.is_empty() {
                return None;
            }
            Some(format!(
                "## Page: {}\n\n{}",
                page.name,
                truncate_chars(&cleaned, MAX_CHARS_PER_PAGE)
            ))
        })
        .collect();

    truncate_chars(&sections.join(PAGE_SEPARATOR), MAX_TOTAL_CHARS)
}
