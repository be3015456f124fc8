//! Diagnostics, validation results and the builder that produces them.
//!
//! A `ResultBuilder` accumulates diagnostics while rules run; `build()` then
//! freezes them into a `ValidationResult`. Validity is never stored: it is
//! recomputed from the error list every time it is asked for.

use crate::core::types::Value;
use indexmap::{IndexMap, IndexSet};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Diagnostic categories produced by the built-in rules.
pub mod category {
    /// Missing or malformed required document keys.
    pub const STRUCTURAL: &str = "structural";
    /// A reference to an alias that no section defines.
    pub const CROSS_REFERENCE: &str = "cross_reference";
    /// An expression matched an unsafe signature.
    pub const SECURITY: &str = "security";
    /// An operation call failed registry validation.
    pub const OPERATION_PARAMETER: &str = "operation_parameter";
    /// A rule implementation itself failed.
    pub const RULE_FAILURE: &str = "rule_failure";
    /// Data-quality and performance advisories.
    pub const QUALITY: &str = "quality";
}

/// How serious a diagnostic is.
///
/// Ordered from least to most severe so `>=` comparisons read naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Lowercase name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which list a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Error,
    Warning,
    Info,
}

impl DiagnosticKind {
    fn default_severity(self) -> Severity {
        match self {
            DiagnosticKind::Error => Severity::Error,
            DiagnosticKind::Warning => Severity::Warning,
            DiagnosticKind::Info => Severity::Info,
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Which list the finding belongs to.
    pub kind: DiagnosticKind,
    /// Broad taxonomy bucket (see [`category`]).
    pub category: String,
    /// Machine-readable finding type, e.g. `missing_required_field`.
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// Dotted/bracketed locator into the document, e.g. `mappings[0].columns_mapping`.
    pub path: String,
    /// How serious the finding is.
    pub severity: Severity,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Name of the mapping the finding belongs to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<String>,
    /// Open key/value bag with finding-specific details.
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub extra: IndexMap<String, Value>,
}

impl Diagnostic {
    /// Create a diagnostic of the given kind with its default severity.
    pub fn new(
        kind: DiagnosticKind,
        category: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let code = code.into();
        let mut message = message.into();
        if message.trim().is_empty() {
            message = format!("{} reported without a message", code);
        }
        Self {
            kind,
            category: category.into(),
            code,
            message,
            path: String::new(),
            severity: kind.default_severity(),
            suggestion: None,
            mapping: None,
            extra: IndexMap::new(),
        }
    }

    /// Create an error diagnostic.
    pub fn error(category: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Error, category, code, message)
    }

    /// Create a warning diagnostic.
    pub fn warning(category: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Warning, category, code, message)
    }

    /// Create an informational diagnostic.
    pub fn info(category: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Info, category, code, message)
    }

    /// Set the document path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Override the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Set the suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Set the owning mapping name.
    pub fn with_mapping(mut self, mapping: impl Into<String>) -> Self {
        self.mapping = Some(mapping.into());
        self
    }

    /// Add an entry to the extra bag.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Prefix the path with `base`, joining with `.` unless the path is an index.
    pub fn rebase(mut self, base: &str) -> Self {
        self.path = join_path(base, &self.path);
        self
    }

    /// Whether this diagnostic makes a result invalid.
    pub fn is_blocking(&self) -> bool {
        self.kind == DiagnosticKind::Error && self.severity >= Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "[{}] {}", self.severity, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.severity, self.path, self.message)
        }
    }
}

/// Join a base path and a relative path into one locator.
pub fn join_path(base: &str, relative: &str) -> String {
    match (base.is_empty(), relative.is_empty()) {
        (true, _) => relative.to_string(),
        (false, true) => base.to_string(),
        (false, false) if relative.starts_with('[') => format!("{}{}", base, relative),
        (false, false) => format!("{}.{}", base, relative),
    }
}

// ============================================================================
// ValidationResult
// ============================================================================

/// The frozen outcome of a validation pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationResult {
    /// Error diagnostics, in emission order.
    pub errors: Vec<Diagnostic>,
    /// Warning diagnostics, in emission order.
    pub warnings: Vec<Diagnostic>,
    /// Informational diagnostics, in emission order.
    pub info: Vec<Diagnostic>,
    /// Free-form metadata about the run.
    pub metadata: IndexMap<String, Value>,
}

impl ValidationResult {
    /// True unless an error diagnostic has severity error or above.
    pub fn is_valid(&self) -> bool {
        !self.errors.iter().any(Diagnostic::is_blocking)
    }

    /// All diagnostics: errors, then warnings, then info.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors.iter().chain(&self.warnings).chain(&self.info)
    }

    /// Count of errors per code, in first-seen order.
    pub fn error_summary(&self) -> IndexMap<String, usize> {
        count_codes(&self.errors)
    }

    /// Count of warnings per code, in first-seen order.
    pub fn warning_summary(&self) -> IndexMap<String, usize> {
        count_codes(&self.warnings)
    }

    /// Unique suggestions across errors and warnings, in order.
    pub fn suggestions(&self) -> Vec<String> {
        let unique: IndexSet<&str> = self
            .errors
            .iter()
            .chain(&self.warnings)
            .filter_map(|d| d.suggestion.as_deref())
            .collect();
        unique.into_iter().map(str::to_string).collect()
    }

    /// Names of mappings that have at least one diagnostic.
    pub fn affected_mappings(&self) -> Vec<String> {
        let unique: IndexSet<&str> = self
            .diagnostics()
            .filter_map(|d| d.mapping.as_deref())
            .collect();
        unique.into_iter().map(str::to_string).collect()
    }

    /// Diagnostics in the given category.
    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics().filter(move |d| d.category == category)
    }

    /// Diagnostics at or above the given severity.
    pub fn filter_by_severity(&self, min: Severity) -> Vec<&Diagnostic> {
        self.diagnostics().filter(|d| d.severity >= min).collect()
    }

    /// Errors with critical severity.
    pub fn critical_errors(&self) -> Vec<&Diagnostic> {
        self.errors
            .iter()
            .filter(|d| d.severity == Severity::Critical)
            .collect()
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        if self.is_valid() {
            if self.warnings.is_empty() {
                "✓ Configuration is valid".to_string()
            } else {
                format!("✓ Configuration is valid with {} warning(s)", self.warnings.len())
            }
        } else {
            format!("✗ Validation failed with {} error(s)", self.errors.len())
        }
    }

    /// Get detailed error messages with suggestions.
    pub fn detailed_errors(&self) -> Vec<String> {
        self.errors
            .iter()
            .enumerate()
            .map(|(i, error)| {
                let mut msg = format!("{}. {}", i + 1, error);
                if let Some(fix) = &error.suggestion {
                    msg.push_str(&format!("\n   → Suggestion: {}", fix));
                }
                msg
            })
            .collect()
    }
}

fn count_codes(diagnostics: &[Diagnostic]) -> IndexMap<String, usize> {
    let mut counts = IndexMap::new();
    for d in diagnostics {
        *counts.entry(d.code.clone()).or_insert(0) += 1;
    }
    counts
}

impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationResult", 5)?;
        state.serialize_field("is_valid", &self.is_valid())?;
        state.serialize_field("errors", &self.errors)?;
        state.serialize_field("warnings", &self.warnings)?;
        state.serialize_field("info", &self.info)?;
        state.serialize_field("metadata", &self.metadata)?;
        state.end()
    }
}

// ============================================================================
// ResultBuilder
// ============================================================================

/// Accumulates diagnostics and metadata for one validation pass.
#[derive(Debug, Clone, Default)]
pub struct ResultBuilder {
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
    info: Vec<Diagnostic>,
    metadata: IndexMap<String, Value>,
}

impl ResultBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error. The diagnostic's kind is forced to `Error`.
    pub fn add_error(&mut self, mut diagnostic: Diagnostic) -> &mut Self {
        diagnostic.kind = DiagnosticKind::Error;
        self.errors.push(diagnostic);
        self
    }

    /// Record a warning. The diagnostic's kind is forced to `Warning`.
    pub fn add_warning(&mut self, mut diagnostic: Diagnostic) -> &mut Self {
        diagnostic.kind = DiagnosticKind::Warning;
        self.warnings.push(diagnostic);
        self
    }

    /// Record an informational note. The diagnostic's kind is forced to `Info`.
    pub fn add_info(&mut self, mut diagnostic: Diagnostic) -> &mut Self {
        diagnostic.kind = DiagnosticKind::Info;
        self.info.push(diagnostic);
        self
    }

    /// Route a diagnostic to the list matching its kind.
    pub fn push(&mut self, diagnostic: Diagnostic) -> &mut Self {
        match diagnostic.kind {
            DiagnosticKind::Error => self.errors.push(diagnostic),
            DiagnosticKind::Warning => self.warnings.push(diagnostic),
            DiagnosticKind::Info => self.info.push(diagnostic),
        }
        self
    }

    /// Route every diagnostic, preserving order.
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) -> &mut Self {
        for d in diagnostics {
            self.push(d);
        }
        self
    }

    /// Set a metadata entry, replacing any previous value.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Append another result's diagnostics after ours; its metadata wins on conflict.
    pub fn merge(&mut self, other: &ValidationResult) -> &mut Self {
        self.errors.extend(other.errors.iter().cloned());
        self.warnings.extend(other.warnings.iter().cloned());
        self.info.extend(other.info.iter().cloned());
        for (key, value) in &other.metadata {
            self.metadata.insert(key.clone(), value.clone());
        }
        self
    }

    /// Number of errors recorded so far.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Freeze the current state into a result. Can be called repeatedly.
    pub fn build(&self) -> ValidationResult {
        ValidationResult {
            errors: self.errors.clone(),
            warnings: self.warnings.clone(),
            info: self.info.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_error(code: &str) -> Diagnostic {
        Diagnostic::error(category::STRUCTURAL, code, format!("{} happened", code))
    }

    #[test]
    fn test_empty_builder_is_valid() {
        let result = ResultBuilder::new().build();
        assert!(result.is_valid());
        assert!(result.errors.is_empty());
        assert_eq!(result.summary(), "✓ Configuration is valid");
    }

    #[test]
    fn test_error_invalidates_result() {
        let mut builder = ResultBuilder::new();
        builder.add_error(sample_error("missing_section"));
        let result = builder.build();
        assert!(!result.is_valid());
        assert!(result.summary().starts_with('✗'));
    }

    #[test]
    fn test_low_severity_error_does_not_invalidate() {
        let mut builder = ResultBuilder::new();
        builder.add_error(sample_error("soft").with_severity(Severity::Warning));
        assert!(builder.build().is_valid());
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let mut builder = ResultBuilder::new();
        builder.add_warning(
            Diagnostic::warning(category::QUALITY, "long_chain", "chain").with_severity(Severity::Critical),
        );
        let result = builder.build();
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_missing_message_gets_default() {
        let diag = Diagnostic::error(category::STRUCTURAL, "missing_section", "  ");
        assert_eq!(diag.message, "missing_section reported without a message");
    }

    #[test]
    fn test_add_forces_kind() {
        let mut builder = ResultBuilder::new();
        builder.add_warning(sample_error("was_error"));
        let result = builder.build();
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings[0].kind, DiagnosticKind::Warning);
    }

    #[test]
    fn test_merge_order_and_metadata() {
        let mut first = ResultBuilder::new();
        first.add_error(sample_error("a"));
        first.set_metadata("profile", "structural");
        first.set_metadata("only_first", 1i64);

        let mut second = ResultBuilder::new();
        second.add_error(sample_error("b"));
        second.set_metadata("profile", "comprehensive");
        let other = second.build();

        first.merge(&other);
        let merged = first.build();
        let codes: Vec<_> = merged.errors.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["a", "b"]);
        assert_eq!(merged.metadata["profile"], Value::from("comprehensive"));
        assert_eq!(merged.metadata["only_first"], Value::Integer(1));
    }

    #[test]
    fn test_build_is_idempotent() {
        let mut builder = ResultBuilder::new();
        builder.add_error(sample_error("a"));
        builder.add_info(Diagnostic::info(category::QUALITY, "note", "fyi"));
        assert_eq!(builder.build(), builder.build());
    }

    #[test]
    fn test_query_helpers() {
        let mut builder = ResultBuilder::new();
        builder
            .add_error(sample_error("dup").with_mapping("m1").with_suggestion("rename"))
            .add_error(sample_error("dup").with_mapping("m2").with_suggestion("rename"))
            .add_error(
                Diagnostic::error(category::SECURITY, "unsafe_expression", "bad")
                    .with_severity(Severity::Critical)
                    .with_mapping("m1"),
            );
        let result = builder.build();
        assert_eq!(result.error_summary()["dup"], 2);
        assert_eq!(result.suggestions(), vec!["rename"]);
        assert_eq!(result.affected_mappings(), vec!["m1", "m2"]);
        assert_eq!(result.critical_errors().len(), 1);
        assert_eq!(result.by_category(category::SECURITY).count(), 1);
        assert_eq!(result.filter_by_severity(Severity::Critical).len(), 1);
        assert!(result.detailed_errors()[0].contains("Suggestion: rename"));
    }

    #[test]
    fn test_rebase_paths() {
        let diag = sample_error("x").with_path("parameters.factor").rebase("mappings[0].transformations[1]");
        assert_eq!(diag.path, "mappings[0].transformations[1].parameters.factor");
        assert_eq!(join_path("mappings", "[2]"), "mappings[2]");
        assert_eq!(join_path("", "settings"), "settings");
    }

    #[test]
    fn test_serialized_result_carries_validity() {
        let mut builder = ResultBuilder::new();
        builder.add_error(sample_error("a").with_extra("field", "source_alias"));
        let json = serde_json::to_value(builder.build()).unwrap();
        assert_eq!(json["is_valid"], serde_json::Value::Bool(false));
        assert_eq!(json["errors"][0]["severity"], "error");
        assert_eq!(json["errors"][0]["extra"]["field"], "source_alias");
    }

    proptest! {
        #[test]
        fn prop_validity_tracks_blocking_errors(severities in proptest::collection::vec(0u8..4, 0..12)) {
            let mut builder = ResultBuilder::new();
            for (i, s) in severities.iter().enumerate() {
                let severity = match s {
                    0 => Severity::Info,
                    1 => Severity::Warning,
                    2 => Severity::Error,
                    _ => Severity::Critical,
                };
                builder.add_error(sample_error(&format!("e{}", i)).with_severity(severity));
            }
            let result = builder.build();
            let expected = !severities.iter().any(|s| *s >= 2);
            prop_assert_eq!(result.is_valid(), expected);
            prop_assert_eq!(result.clone(), builder.build());
        }
    }
}
