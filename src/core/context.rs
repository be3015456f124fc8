//! The validation context shared by every rule in a pass.
//!
//! A context wraps a read-only document plus a scratch metadata map. Rules
//! may leave notes in the metadata for rules that run after them; the
//! document itself can only be borrowed immutably.

use crate::core::types::{ConfigDocument, Value};
use indexmap::IndexMap;

/// Context provided to rules during one validation pass.
#[derive(Debug, Clone)]
pub struct ValidationContext<'a> {
    document: &'a ConfigDocument,
    metadata: IndexMap<String, Value>,
}

/// A view of one entry in the document's `mappings` list.
#[derive(Debug, Clone, Copy)]
pub struct MappingView<'a> {
    /// Position in the `mappings` list.
    pub index: usize,
    /// The raw mapping node.
    pub node: &'a Value,
}

impl<'a> MappingView<'a> {
    /// Locator for this mapping, e.g. `mappings[2]`.
    pub fn path(&self) -> String {
        format!("mappings[{}]", self.index)
    }

    /// Locator for a field of this mapping.
    pub fn field_path(&self, field: &str) -> String {
        format!("mappings[{}].{}", self.index, field)
    }

    /// The mapping's `mapping_name`, or a positional fallback.
    pub fn name(&self) -> String {
        self.node
            .get("mapping_name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("mapping_{}", self.index))
    }

    /// Look up a field of this mapping.
    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.node.get(field)
    }

    /// Entries of a list-valued field, or an empty slice.
    pub fn list(&self, field: &str) -> &'a [Value] {
        self.node
            .get(field)
            .and_then(Value::as_sequence)
            .unwrap_or_default()
    }

    /// Whether the node is a mapping at all.
    pub fn is_mapping(&self) -> bool {
        self.node.as_mapping().is_some()
    }
}

impl<'a> ValidationContext<'a> {
    /// Create a context over a document.
    pub fn new(document: &'a ConfigDocument) -> Self {
        Self {
            document,
            metadata: IndexMap::new(),
        }
    }

    /// The document under validation.
    pub fn document(&self) -> &'a ConfigDocument {
        self.document
    }

    /// Iterate over the document's mappings.
    pub fn mappings(&self) -> impl Iterator<Item = MappingView<'a>> + 'a {
        self.document
            .mappings()
            .iter()
            .enumerate()
            .map(|(index, node)| MappingView { index, node })
    }

    /// Record a note for later rules.
    pub fn set_note(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Read a note left by an earlier rule.
    pub fn note(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// All notes recorded so far.
    pub fn metadata(&self) -> &IndexMap<String, Value> {
        &self.metadata
    }
}
