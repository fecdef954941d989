//! Ground-truth records: loading, alias resolution and lookup
//!
//! The input is a stream of JSON objects, one per domain, usually one per
//! line:
//!
//! ```json
//! {"url": "https://acme.com", "features": {
//!     "phone": {"present": true, "value": "(555) 123-4567"},
//!     "is_working": {"present": true, "value": "yes"},
//!     "industries": "fintech, payments",
//!     "patents": {"verifiable": false}
//! }}
//! ```
//!
//! Objects may span several lines. Feature entries are either an object with
//! `present`, `value`, `variants` and `verifiable` keys or a bare value.

use super::canonical::is_absent;
use crate::schema::{FieldKind, Schema};
use crate::url::Domain;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GroundTruthError {
    #[error("Failed to read ground truth {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid ground truth record {record}: {message}")]
    Parse { record: usize, message: String },
}

pub type GroundTruthResult<T> = Result<T, GroundTruthError>;

/// Accepted value for one field of one domain
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruthValue {
    pub present: bool,
    pub value: Value,
    /// Alternative accepted values
    pub variants: Vec<Value>,
    /// `false` marks the field as not checkable for this domain
    pub verifiable: bool,
}

impl GroundTruthValue {
    pub fn new(value: Value) -> Self {
        Self {
            present: !is_absent(&value),
            value,
            variants: Vec::new(),
            verifiable: true,
        }
    }

    pub fn unverifiable() -> Self {
        Self {
            present: false,
            value: Value::Null,
            variants: Vec::new(),
            verifiable: false,
        }
    }

    pub fn with_variants(mut self, variants: Vec<Value>) -> Self {
        self.variants = variants;
        self
    }

    /// Whether the domain has a value for this field
    pub fn has_value(&self) -> bool {
        self.present && !is_absent(&self.value)
    }
}

/// Ground truth for one domain, keyed by schema field name
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruthRecord {
    pub domain: Domain,
    pub fields: BTreeMap<String, GroundTruthValue>,
}

impl GroundTruthRecord {
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: GroundTruthValue) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn field(&self, name: &str) -> Option<&GroundTruthValue> {
        self.fields.get(name)
    }
}

/// Every ground-truth record of a run, looked up by site key
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    records: HashMap<String, GroundTruthRecord>,
}

impl GroundTruth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record, replacing any earlier one for the same site
    pub fn insert(&mut self, record: GroundTruthRecord) {
        self.records
            .insert(record.domain.site_key().to_string(), record);
    }

    pub fn from_records(records: impl IntoIterator<Item = GroundTruthRecord>) -> Self {
        let mut truth = Self::new();
        for record in records {
            truth.insert(record);
        }
        truth
    }

    /// Loads a ground-truth file, resolving field names against `schema`
    pub fn load(path: &Path, schema: &Schema) -> GroundTruthResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| GroundTruthError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let truth = Self::parse(&content, schema)?;
        tracing::info!(
            "Loaded {} ground truth records from {}",
            truth.len(),
            path.display()
        );
        Ok(truth)
    }

    /// Parses a stream of JSON records
    pub fn parse(content: &str, schema: &Schema) -> GroundTruthResult<Self> {
        let mut truth = Self::new();
        let stream = serde_json::Deserializer::from_str(content).into_iter::<Value>();

        for (index, item) in stream.enumerate() {
            let record_no = index + 1;
            let value = item.map_err(|e| GroundTruthError::Parse {
                record: record_no,
                message: e.to_string(),
            })?;
            truth.insert(parse_record(record_no, &value, schema)?);
        }

        Ok(truth)
    }

    /// Record for `domain`, matching hosts with `www.` stripped
    pub fn get(&self, domain: &Domain) -> Option<&GroundTruthRecord> {
        self.records.get(domain.site_key())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Domains with a record, sorted
    pub fn domains(&self) -> Vec<&Domain> {
        let mut domains: Vec<&Domain> = self.records.values().map(|r| &r.domain).collect();
        domains.sort();
        domains
    }
}

fn parse_record(
    record_no: usize,
    value: &Value,
    schema: &Schema,
) -> GroundTruthResult<GroundTruthRecord> {
    let parse_error = |message: String| GroundTruthError::Parse {
        record: record_no,
        message,
    };

    let object = value
        .as_object()
        .ok_or_else(|| parse_error("record is not an object".to_string()))?;

    let location = ["url", "domain"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .ok_or_else(|| parse_error("record has no url or domain".to_string()))?;
    let domain = Domain::parse(location).map_err(|e| parse_error(e.to_string()))?;

    let mut record = GroundTruthRecord::new(domain);
    let Some(features) = object.get("features").and_then(Value::as_object) else {
        return Ok(record);
    };

    // Exact schema names are applied last so they win over aliases
    let mut entries: Vec<(&String, &Value, bool, bool)> = Vec::new();
    for (name, raw) in features {
        let lookup = name.trim().replace(' ', "_");
        match schema.resolve(&lookup) {
            Some((field, invert)) => {
                let exact = field.name == lookup;
                entries.push((&field.name, raw, invert, exact));
            }
            None => tracing::debug!("Ignoring unknown ground truth field '{}'", name),
        }
    }
    entries.sort_by_key(|(_, _, _, exact)| *exact);

    for (name, raw, invert, _) in entries {
        let kind = schema.field(name).map(|f| f.kind).unwrap_or_default();
        record
            .fields
            .insert(name.clone(), parse_value(raw, kind, invert));
    }

    Ok(record)
}

fn parse_value(raw: &Value, kind: FieldKind, invert: bool) -> GroundTruthValue {
    let mut entry = match raw.as_object() {
        Some(object) if is_entry_object(object) => {
            let value = object.get("value").cloned().unwrap_or(Value::Null);
            let present = object
                .get("present")
                .and_then(Value::as_bool)
                .unwrap_or_else(|| !is_absent(&value));
            let variants = object
                .get("variants")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let verifiable = object
                .get("verifiable")
                .and_then(Value::as_bool)
                .unwrap_or(true);
            GroundTruthValue {
                present,
                value,
                variants,
                verifiable,
            }
        }
        _ => GroundTruthValue::new(raw.clone()),
    };

    if kind == FieldKind::Boolean && entry.present {
        entry.value = Value::String(boolean_truth(&entry.value, invert).to_string());
        entry.variants.clear();
    }
    entry
}

fn is_entry_object(object: &Map<String, Value>) -> bool {
    ["present", "value", "variants", "verifiable"]
        .iter()
        .any(|key| object.contains_key(*key))
}

/// Boolean reading of a ground-truth value
///
/// Values starting with `yes`/`true` or equal to `1` are true, `no`/`false`/`0`
/// false. Anything else on a present field counts as true.
fn boolean_truth(value: &Value, invert: bool) -> bool {
    let truth = match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        other => {
            let text = super::canonical::value_text(other).trim().to_lowercase();
            !(text.starts_with("no") || text.starts_with("false") || text == "0")
        }
    };
    truth != invert
}
