//! Per-kind canonical forms used for value equality
//!
//! | kind       | canonical form                                              |
//! |------------|-------------------------------------------------------------|
//! | `phone`    | digits only; a leading `1` is dropped from 11-digit numbers |
//! | `email`    | trimmed, lowercased, `mailto:` removed                      |
//! | `url`      | lowercased, scheme, `www.` and trailing `/` removed         |
//! | `currency` | digits and `.` only, trailing fractional zeros removed      |
//! | `boolean`  | `true`/`false` (`yes`, `no`, `1`, `0` accepted)             |
//! | `text`     | lowercased, punctuation to spaces, whitespace collapsed     |
//! | `enum`     | as `text`                                                   |
//! | `list`     | each item as `text`, de-duplicated                          |
//!
//! Values that canonicalize to an empty string under a specific kind fall
//! back to the `text` form, so "free" still compares as a price.

use crate::schema::FieldKind;
use serde_json::Value;

/// Text values meaning "no value"
pub const ABSENT_MARKERS: &[&str] = &["", "unknown", "null", "none", "n/a"];

pub fn is_absent_marker(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    ABSENT_MARKERS.contains(&lowered.as_str())
}

/// Whether a field value counts as absent
///
/// `null`, absent markers, and lists or objects with no present item.
pub fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => is_absent_marker(s),
        Value::Array(items) => items.iter().all(is_absent),
        Value::Object(map) => map.values().all(is_absent),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Scalar rendered as plain text, without JSON quoting
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

fn canonical_text(text: &str) -> String {
    let spaced: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn canonical_phone(text: &str) -> String {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 11 && digits.starts_with('1') {
        digits[1..].to_string()
    } else {
        digits
    }
}

fn canonical_email(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    lowered
        .strip_prefix("mailto:")
        .unwrap_or(&lowered)
        .trim()
        .to_string()
}

fn canonical_url(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    let without_www = without_scheme
        .strip_prefix("www.")
        .unwrap_or(without_scheme);
    without_www.trim_end_matches('/').to_string()
}

fn canonical_currency(text: &str) -> String {
    let number: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let number = number.trim_matches('.');
    if number.contains('.') {
        number
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        number.to_string()
    }
}

fn canonical_boolean(text: &str) -> String {
    match text.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => "true".to_string(),
        "false" | "no" | "0" => "false".to_string(),
        other => canonical_text(other),
    }
}

/// Canonical form of a scalar value of the given kind
pub fn canonicalize(kind: FieldKind, text: &str) -> String {
    let canonical = match kind {
        FieldKind::Phone => canonical_phone(text),
        FieldKind::Email => canonical_email(text),
        FieldKind::Url => canonical_url(text),
        FieldKind::Currency => canonical_currency(text),
        FieldKind::Boolean => canonical_boolean(text),
        FieldKind::Text | FieldKind::Enum | FieldKind::List => canonical_text(text),
    };
    if canonical.is_empty() {
        canonical_text(text)
    } else {
        canonical
    }
}

/// Canonical items of a list value
///
/// A string is split on commas. Empty and absent items are dropped; order is
/// first-seen.
pub fn canonical_items(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::Array(items) => items.iter().map(value_text).collect(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        Value::Null => Vec::new(),
        other => vec![value_text(other)],
    };

    let mut items: Vec<String> = Vec::new();
    for item in raw {
        if is_absent_marker(&item) {
            continue;
        }
        let canonical = canonical_text(&item);
        if !canonical.is_empty() && !items.contains(&canonical) {
            items.push(canonical);
        }
    }
    items
}
