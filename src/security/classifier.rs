//! Safe/unsafe verdicts for free-text SQL-like expressions.

use crate::core::types::Value;
use crate::security::allowlist;
use crate::security::signatures::{builtin_signatures, SecuritySignature, SignatureKind};
use serde::Serialize;

/// Note attached when the input could not be fully understood.
pub const INCOMPLETE_NOTE: &str = "classification may be incomplete";

/// One signature that matched an expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureMatch {
    /// Signature identifier.
    pub name: String,
    /// Threat class.
    pub kind: SignatureKind,
    /// What the signature detects.
    pub description: String,
    /// The matched text.
    pub fragment: String,
}

/// Verdict for one expression.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Classification {
    /// The normalized expression that was classified.
    pub expression: String,
    /// At least one signature matched and no benign shape applied.
    #[serde(rename = "unsafe")]
    pub is_unsafe: bool,
    /// The whole expression matched a benign shape.
    pub allowlisted: bool,
    /// Name of the benign shape, when allow-listed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    /// Every signature that matched, in table order.
    pub matches: Vec<SignatureMatch>,
    /// Remarks about malformed input.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Classification {
    /// Kinds of all matched signatures, in table order.
    pub fn matched_signatures(&self) -> Vec<SignatureKind> {
        self.matches.iter().map(|m| m.kind).collect()
    }

    /// The first match, which is the one reported as the primary finding.
    pub fn primary(&self) -> Option<&SignatureMatch> {
        self.matches.first()
    }

    /// Whether a note flagged the verdict as possibly incomplete.
    pub fn is_incomplete(&self) -> bool {
        !self.notes.is_empty()
    }
}

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn normalize(expression: &str) -> String {
    expression.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Classifies expressions against a benign allow-list and an ordered
/// signature table.
///
/// The allow-list is consulted first: an expression whose entire text has a
/// benign shape (`'literal' AS alias`, a column, `CASE ... END`, a simple
/// function call) is safe even if a keyword inside it overlaps a signature.
/// Otherwise every signature is tried and all matches are kept.
#[derive(Debug, Clone)]
pub struct ExpressionSecurityClassifier {
    signatures: Vec<SecuritySignature>,
}

impl ExpressionSecurityClassifier {
    /// Create a classifier with the built-in signatures.
    pub fn new() -> Self {
        Self {
            signatures: builtin_signatures().to_vec(),
        }
    }

    /// Append a signature after the built-in ones.
    pub fn with_signature(mut self, signature: SecuritySignature) -> Self {
        self.signatures.push(signature);
        self
    }

    /// Signatures in scan order.
    pub fn signatures(&self) -> &[SecuritySignature] {
        &self.signatures
    }

    /// Classify one expression. Never fails; empty input is safe.
    pub fn classify(&self, expression: &str) -> Classification {
        let normalized = normalize(expression);
        let mut classification = Classification {
            expression: normalized.clone(),
            ..Classification::default()
        };
        if normalized.is_empty() {
            return classification;
        }

        if let Some(note) = malformed_note(&normalized) {
            classification.notes.push(note);
        }

        if let Some(shape) = allowlist::matching_shape(&normalized) {
            classification.allowlisted = true;
            classification.shape = Some(shape.to_string());
            return classification;
        }

        classification.matches = self
            .signatures
            .iter()
            .filter_map(|signature| {
                signature.pattern.find(&normalized).map(|m| SignatureMatch {
                    name: signature.name.clone(),
                    kind: signature.kind,
                    description: signature.description.clone(),
                    fragment: m.as_str().to_string(),
                })
            })
            .collect();
        classification.is_unsafe = !classification.matches.is_empty();
        classification
    }

    /// Classify a document value. Anything but a string is safe.
    pub fn classify_value(&self, value: &Value) -> Classification {
        match value.as_str() {
            Some(text) => self.classify(text),
            None => Classification::default(),
        }
    }
}

impl Default for ExpressionSecurityClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn malformed_note(normalized: &str) -> Option<String> {
    let masked = allowlist::mask_literals(normalized);
    if masked.replace("''", "").contains('\'') {
        return Some(format!("{}: unterminated string literal", INCOMPLETE_NOTE));
    }
    if masked.matches('"').count() % 2 != 0 {
        return Some(format!("{}: unterminated quoted identifier", INCOMPLETE_NOTE));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_allowlist_wins() {
        let classifier = ExpressionSecurityClassifier::new();
        let result = classifier.classify("'gdx_user' AS created_by");
        assert!(!result.is_unsafe);
        assert!(result.allowlisted);
        assert!(result.matches.is_empty());
        assert_eq!(result.shape.as_deref(), Some("literal"));
    }

    #[test]
    fn test_stacked_drop_is_unsafe() {
        let classifier = ExpressionSecurityClassifier::new();
        let result = classifier.classify("id; DROP TABLE users; --");
        assert!(result.is_unsafe);
        assert!(!result.allowlisted);
        let kinds = result.matched_signatures();
        assert!(kinds.contains(&SignatureKind::DangerousKeyword));
        assert!(kinds.contains(&SignatureKind::CommentEvasion));
        assert!(kinds.contains(&SignatureKind::Injection));
        assert_eq!(result.primary().map(|m| m.name.as_str()), Some("stacked_statement"));
    }

    #[test]
    fn test_whitespace_is_normalized() {
        let classifier = ExpressionSecurityClassifier::new();
        let result = classifier.classify("  email\n\tUNION   SELECT password  ");
        assert_eq!(result.expression, "email UNION SELECT password");
        assert_eq!(result.matched_signatures(), vec![SignatureKind::Injection]);
    }

    #[test]
    fn test_empty_and_non_string_are_safe() {
        let classifier = ExpressionSecurityClassifier::new();
        assert!(!classifier.classify("").is_unsafe);
        assert!(!classifier.classify("   ").is_unsafe);
        assert!(!classifier.classify_value(&Value::Integer(5)).is_unsafe);
        assert!(!classifier.classify_value(&Value::Null).is_unsafe);
    }

    #[test]
    fn test_malformed_input_gets_note() {
        let classifier = ExpressionSecurityClassifier::new();
        let result = classifier.classify("name' OR 1=1");
        assert!(result.is_incomplete());
        assert!(result.notes[0].starts_with(INCOMPLETE_NOTE));
        assert!(result.is_unsafe);

        let plain = classifier.classify("it's broken");
        assert!(!plain.is_unsafe);
        assert!(plain.is_incomplete());
    }

    #[test]
    fn test_complete_literals_leave_no_note() {
        let classifier = ExpressionSecurityClassifier::new();
        for expression in [
            "'gdx_user' AS created_by",
            "'5\"' AS inches",
            "'it''s' AS label",
            "CASE WHEN s = 'A' THEN 1 ELSE 0 END as flag",
        ] {
            let result = classifier.classify(expression);
            assert!(result.notes.is_empty(), "{}: {:?}", expression, result.notes);
            assert!(!result.is_unsafe);
        }
    }

    #[test]
    fn test_payload_inside_case_is_unsafe() {
        let classifier = ExpressionSecurityClassifier::new();
        let result = classifier.classify("CASE WHEN 1=1 THEN DROP TABLE users END");
        assert!(!result.allowlisted);
        assert!(result.is_unsafe);
        assert_eq!(result.matched_signatures(), vec![SignatureKind::DangerousKeyword]);
    }

    #[test]
    fn test_legit_expressions_are_safe() {
        let classifier = ExpressionSecurityClassifier::new();
        for expression in [
            "customer_id as id",
            "UPPER(customer_name) as name",
            "CASE WHEN status = 'active' THEN 1 ELSE 0 END as is_active",
            "DATE_FORMAT(created_date, '%Y-%m-%d') as formatted_date",
            "amount * rate as converted",
            "first_name || ' ' || last_name as full_name",
        ] {
            let result = classifier.classify(expression);
            assert!(!result.is_unsafe, "{} flagged: {:?}", expression, result.matches);
        }
    }

    #[test]
    fn test_custom_signature() {
        let classifier = ExpressionSecurityClassifier::new().with_signature(
            SecuritySignature::new("eval", SignatureKind::CommandExec, "eval call", r"\beval\s*\(").unwrap(),
        );
        assert!(classifier.classify("eval(payload) + 1").is_unsafe);
        assert_eq!(classifier.signatures().len(), builtin_signatures().len() + 1);
    }

    proptest! {
        #[test]
        fn prop_classify_never_panics(text in ".*") {
            let classifier = ExpressionSecurityClassifier::new();
            let result = classifier.classify(&text);
            prop_assert_eq!(result.is_unsafe, !result.matches.is_empty() && !result.allowlisted);
        }

        #[test]
        fn prop_quoted_literal_alias_is_allowlisted(
            literal in "[a-zA-Z0-9_ @.-]{0,20}",
            alias in "col_[a-z0-9_]{0,15}",
        ) {
            let classifier = ExpressionSecurityClassifier::new();
            let result = classifier.classify(&format!("'{}' AS {}", literal, alias));
            prop_assert!(!result.is_unsafe);
        }
    }
}
