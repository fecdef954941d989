//! Normalization of raw model output into schema-shaped values
//!
//! Every schema field ends up as `null`, a string, or a list of strings.
//! Absent markers (`unknown`, `none`, empty) become `null`.

use crate::compare::{is_absent, is_absent_marker};
use crate::schema::{FieldKind, FieldSpec, Schema};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// Scalar rendered as trimmed text
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn normalize_boolean(value: &Value) -> Value {
    match scalar_text(value) {
        Some(text) => match text.to_lowercase().as_str() {
            "true" | "yes" => Value::String("true".to_string()),
            "false" | "no" => Value::String("false".to_string()),
            _ if is_absent_marker(&text) => Value::Null,
            _ => Value::String(text),
        },
        None => Value::Null,
    }
}

fn normalize_list(value: &Value) -> Value {
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    };

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let Some(text) = scalar_text(item) else {
            continue;
        };
        if is_absent_marker(&text) {
            continue;
        }
        if seen.insert(text.to_lowercase()) {
            out.push(Value::String(text));
        }
    }

    if out.is_empty() {
        Value::Null
    } else {
        Value::Array(out)
    }
}

fn normalize_scalar(value: &Value) -> Value {
    match value {
        Value::Array(items) => {
            // A list where a scalar was asked for: keep its items as one string
            let parts: Vec<String> = items
                .iter()
                .filter_map(scalar_text)
                .filter(|s| !is_absent_marker(s))
                .collect();
            if parts.is_empty() {
                Value::Null
            } else {
                Value::String(parts.join(", "))
            }
        }
        other => match scalar_text(other) {
            Some(text) if !is_absent_marker(&text) => Value::String(text),
            _ => Value::Null,
        },
    }
}

/// Normalizes one field value according to its declared kind
pub fn normalize_value(field: &FieldSpec, value: &Value) -> Value {
    let normalized = match field.kind {
        FieldKind::Boolean => normalize_boolean(value),
        FieldKind::List => normalize_list(value),
        _ => normalize_scalar(value),
    };
    if is_absent(&normalized) {
        Value::Null
    } else {
        normalized
    }
}

/// Picks every schema field out of a model response object
///
/// Keys are matched exactly first, then case-insensitively. Fields the model
/// left out are `null`; keys outside the schema are dropped.
pub fn normalize_fields(raw: &Map<String, Value>, schema: &Schema) -> BTreeMap<String, Value> {
    schema
        .fields()
        .iter()
        .map(|field| {
            let value = raw.get(&field.name).or_else(|| {
                raw.iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(&field.name))
                    .map(|(_, v)| v)
            });
            let normalized = value.map_or(Value::Null, |v| normalize_value(field, v));
            (field.name.clone(), normalized)
        })
        .collect()
}
