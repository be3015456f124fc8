//! Built-in validation rules.
//!
//! Each submodule contributes rule descriptors; [`builtin_rules`] returns
//! them in execution order. Rules reach shared services (registry,
//! classifier, resolver, config) through [`RuleServices`].
//!
//! Ordering dependency: `collect_source_aliases` writes each mapping's alias
//! set into the context under [`alias_note_key`];
//! `transformation_references` and `column_mapping_references` read it and
//! fall back to extracting the aliases themselves when it is missing.

mod quality;
mod references;
mod security;
mod settings;
mod structure;

use crate::core::config::ValidatorConfig;
use crate::core::context::{MappingView, ValidationContext};
use crate::core::error::{RuleError, RuleResult};
use crate::core::types::Value;
use crate::operations::registry::OperationRegistry;
use crate::references::resolver::CrossReferenceResolver;
use crate::security::classifier::ExpressionSecurityClassifier;
use crate::validation::engine::RuleDescriptor;
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;

/// Rule selectors. A rule belongs to one or more of these.
pub mod selector {
    /// Shape of mappings, transformations and column sections.
    pub const STRUCTURE: &str = "structure";
    /// Operation calls checked against the registry.
    pub const OPERATIONS: &str = "operations";
    /// Alias references.
    pub const CROSS_REFERENCE: &str = "cross_reference";
    /// Duplicates and transformation-chain advisories.
    pub const QUALITY: &str = "quality";
    /// Expression signature scanning.
    pub const SECURITY: &str = "security";
    /// Shape of SQL-like source expressions.
    pub const SQL: &str = "sql";
    /// Job and partition settings.
    pub const SETTINGS: &str = "settings";
    /// Document-wide checks.
    pub const DOCUMENT: &str = "document";

    /// Every selector, in catalogue order.
    pub const ALL: [&str; 8] = [DOCUMENT, SETTINGS, STRUCTURE, OPERATIONS, CROSS_REFERENCE, QUALITY, SECURITY, SQL];
}

/// Shared services the built-in rules use.
#[derive(Clone)]
pub struct RuleServices {
    /// Operation specs for call validation.
    pub registry: Arc<OperationRegistry>,
    /// Expression classifier.
    pub classifier: Arc<ExpressionSecurityClassifier>,
    /// Alias resolver.
    pub resolver: Arc<CrossReferenceResolver>,
    /// Thresholds.
    pub config: Arc<ValidatorConfig>,
}

impl RuleServices {
    /// Services built from a configuration and a registry.
    pub fn new(config: ValidatorConfig, registry: Arc<OperationRegistry>) -> Self {
        Self {
            resolver: Arc::new(CrossReferenceResolver::from_config(&config)),
            classifier: Arc::new(ExpressionSecurityClassifier::new()),
            registry,
            config: Arc::new(config),
        }
    }
}

/// The built-in rules, in execution order.
pub fn builtin_rules(services: &RuleServices) -> Vec<RuleDescriptor> {
    vec![
        structure::document_structure(),
        settings::job_settings(),
        settings::partition_settings(),
        structure::mapping_structure(),
        structure::transformation_structure(),
        structure::column_sections(),
        structure::operation_parameters(services),
        references::collect_source_aliases(services),
        references::transformation_references(services),
        references::column_mapping_references(services),
        quality::duplicate_targets(),
        quality::transformation_chains(services),
        security::expression_security(services),
        security::expression_shape(services),
    ]
}

/// Context metadata key under which a mapping's aliases are recorded.
pub fn alias_note_key(view: &MappingView<'_>) -> String {
    format!("aliases.{}", view.path())
}

/// Aliases of a mapping: the recorded note if present, otherwise extracted.
///
/// Returns `None` when the mapping has no `source_columns_interested` list,
/// in which case its references cannot be checked.
pub(crate) fn known_aliases(
    ctx: &ValidationContext<'_>,
    view: &MappingView<'_>,
    resolver: &CrossReferenceResolver,
) -> RuleResult<Option<IndexSet<String>>> {
    let key = alias_note_key(view);
    if let Some(note) = ctx.note(&key) {
        let entries = note.as_sequence().ok_or_else(|| RuleError::MalformedNode {
            path: key.clone(),
            expected: "a list of aliases".to_string(),
        })?;
        return Ok(Some(entries.iter().filter_map(Value::as_str).map(str::to_string).collect()));
    }
    Ok(view
        .get("source_columns_interested")
        .and_then(Value::as_sequence)
        .map(|section| resolver.extract_aliases(section)))
}

/// One entry of a transformation's `transformations` list.
#[derive(Debug, Clone)]
pub(crate) struct OperationSite<'a> {
    /// Index of the owning transformation.
    pub transformation: usize,
    /// Index within the operation list.
    pub index: usize,
    /// The operation node.
    pub node: &'a Value,
    /// Locator of the operation node.
    pub path: String,
}

impl<'a> OperationSite<'a> {
    /// The `type` field, when it is a string.
    pub fn op_type(&self) -> Option<&'a str> {
        self.node.get("type").and_then(Value::as_str)
    }

    /// One parameter value, ignoring nulls.
    pub fn parameter(&self, name: &str) -> Option<&'a Value> {
        self.node
            .get("parameters")
            .and_then(|p| p.get(name))
            .filter(|v| !v.is_null())
    }
}

/// Every operation entry of a mapping, in document order.
pub(crate) fn operation_sites<'a>(view: &MappingView<'a>) -> Vec<OperationSite<'a>> {
    let mut sites = Vec::new();
    for (t, transformation) in view.list("column_transformations").iter().enumerate() {
        let ops = transformation
            .get("transformations")
            .and_then(Value::as_sequence)
            .unwrap_or_default();
        for (index, node) in ops.iter().enumerate() {
            sites.push(OperationSite {
                transformation: t,
                index,
                node,
                path: format!("{}[{}].transformations[{}]", view.field_path("column_transformations"), t, index),
            });
        }
    }
    sites
}

/// The parameters of an operation as a map; absent or malformed gives empty.
pub(crate) fn parameter_map(node: &Value) -> IndexMap<String, Value> {
    node.get("parameters").and_then(Value::as_mapping).cloned().unwrap_or_default()
}

/// Shorten long text for messages.
pub(crate) fn excerpt(text: &str) -> String {
    const LIMIT: usize = 100;
    if text.chars().count() <= LIMIT {
        text.to_string()
    } else {
        let head: String = text.chars().take(LIMIT).collect();
        format!("{}...", head)
    }
}
