//! Target extraction schema
//!
//! The schema is the list of fields every extractor is asked to fill and the
//! comparator scores. Each field declares a [`FieldKind`] that selects its
//! canonicalization rules during comparison.

mod company;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use company::company_schema;

/// Declared value type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Boolean,
    Enum,
    List,
    Phone,
    Email,
    Url,
    Currency,
}

impl FieldKind {
    /// Returns the lowercase identifier used in configs and prompts
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Enum => "enum",
            Self::List => "list",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Url => "url",
            Self::Currency => "currency",
        }
    }
}

impl Default for FieldKind {
    fn default() -> Self {
        Self::Text
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A legacy ground-truth name that maps onto a schema field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAlias {
    pub name: String,

    /// The legacy field carries the opposite boolean meaning
    #[serde(default)]
    pub invert: bool,
}

/// One field of the target schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,

    #[serde(default)]
    pub kind: FieldKind,

    #[serde(default)]
    pub description: String,

    /// Allowed values for `enum` and `boolean` fields
    #[serde(default)]
    pub allowed: Vec<String>,

    #[serde(default)]
    pub aliases: Vec<FieldAlias>,
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            allowed: Vec::new(),
            aliases: Vec::new(),
        }
    }

    pub fn with_allowed(mut self, allowed: &[&str]) -> Self {
        self.allowed = allowed.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_alias(mut self, name: &str, invert: bool) -> Self {
        self.aliases.push(FieldAlias {
            name: name.to_string(),
            invert,
        });
        self
    }
}

/// Ordered set of fields to extract and score
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Resolves a field name as it appears in a ground-truth record
    ///
    /// Returns the schema field and whether its boolean value must be inverted.
    /// Exact names win over aliases.
    pub fn resolve(&self, name: &str) -> Option<(&FieldSpec, bool)> {
        if let Some(field) = self.field(name) {
            return Some((field, false));
        }
        self.fields.iter().find_map(|field| {
            field
                .aliases
                .iter()
                .find(|alias| alias.name == name)
                .map(|alias| (field, alias.invert))
        })
    }

    /// Hex SHA-256 over every field's name, kind and allowed values
    ///
    /// Extraction artifacts record this so a schema change invalidates them.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for field in &self.fields {
            hasher.update(field.name.as_bytes());
            hasher.update([0u8]);
            hasher.update(field.kind.as_str().as_bytes());
            for allowed in &field.allowed {
                hasher.update([1u8]);
                hasher.update(allowed.as_bytes());
            }
            hasher.update([2u8]);
        }
        hex::encode(hasher.finalize())
    }
}

impl Default for Schema {
    fn default() -> Self {
        company_schema()
    }
}
