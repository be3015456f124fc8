//! Core value types for parsed configuration documents.
//!
//! Documents arrive already parsed (YAML or JSON) and are held as a closed
//! enum tree:
//! - Closed set of shapes: scalars, sequences and string-keyed mappings
//! - Order preserving: mappings keep the key order of the source text
//! - Serialization: serde handles the untagged enum natively

use crate::core::error::MapguardError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A node in a parsed configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(untagged)]
pub enum Value {
    /// Explicit null or an empty node
    #[default]
    Null,
    /// Boolean scalar
    Bool(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Ordered sequence of values
    Sequence(Vec<Value>),
    /// Ordered mapping from string keys to values
    Mapping(IndexMap<String, Value>),
}

// ============================================================================
// Value Implementation
// ============================================================================

impl Value {
    /// Name of this value's shape, as used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Sequence(_) => "list",
            Value::Mapping(_) => "dict",
        }
    }

    /// Look up a key when this value is a mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    /// Check whether this value is a mapping containing `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Try to get this value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Try to get this value as an integer.
    pub fn as_i64(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    /// Try to get this value as a float.
    /// Integers are automatically converted to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    /// Try to get this value as a sequence.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        if let Value::Sequence(items) = self {
            Some(items)
        } else {
            None
        }
    }

    /// Try to get this value as a mapping.
    pub fn as_mapping(&self) -> Option<&IndexMap<String, Value>> {
        if let Value::Mapping(map) = self {
            Some(map)
        } else {
            None
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is an integer or a float.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }

    /// Equality that treats `2` and `2.0` as the same number.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
            _ => self == other,
        }
    }

    /// Render a scalar the way it was most likely written in the source.
    ///
    /// Containers render as a short shape description.
    pub fn display_scalar(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Sequence(items) => write!(f, "list[{}]", items.len()),
            Value::Mapping(map) => write!(f, "dict{{{} entries}}", map.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Integer(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Value::Mapping(map)
    }
}

// ============================================================================
// ConfigDocument
// ============================================================================

/// A parsed mapping-job configuration.
///
/// The root is always a mapping. The document is read-only to the validator;
/// rules only ever hold shared references into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct ConfigDocument {
    root: Value,
}

impl ConfigDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self {
            root: Value::Mapping(IndexMap::new()),
        }
    }

    /// Wrap an already-built root mapping.
    pub fn from_mapping(map: IndexMap<String, Value>) -> Self {
        Self {
            root: Value::Mapping(map),
        }
    }

    /// Parse YAML text into a document.
    pub fn from_yaml_str(text: &str) -> Result<Self, MapguardError> {
        let value: Value = serde_yaml::from_str(text)?;
        Self::try_from(value)
    }

    /// Parse JSON text into a document.
    pub fn from_json_str(text: &str) -> Result<Self, MapguardError> {
        let value: Value = serde_json::from_str(text)?;
        Self::try_from(value)
    }

    /// The root node (always a mapping).
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Look up a top-level key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// The `settings` section, if present.
    pub fn settings(&self) -> Option<&Value> {
        self.get("settings")
    }

    /// The entries of the `mappings` section.
    ///
    /// Returns an empty slice when the section is absent or not a list.
    pub fn mappings(&self) -> &[Value] {
        self.get("mappings")
            .and_then(Value::as_sequence)
            .unwrap_or_default()
    }
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Value> for ConfigDocument {
    type Error = MapguardError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Mapping(_) => Ok(Self { root: value }),
            Value::Null => Ok(Self::new()),
            other => Err(MapguardError::Document {
                found: other.type_name().to_string(),
            }),
        }
    }
}

impl From<ConfigDocument> for Value {
    fn from(doc: ConfigDocument) -> Self {
        doc.root
    }
}
