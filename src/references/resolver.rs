//! Resolution of alias references against the aliases a mapping defines.

use crate::core::config::ValidatorConfig;
use crate::core::result::{category, Diagnostic};
use crate::core::similarity::closest_match;
use crate::core::types::Value;
use crate::references::aliases;
use indexmap::IndexSet;

/// Suggestion used when no alias is close enough.
pub const NO_SIMILAR_ALIAS: &str = "no similar alias found";

/// Checks that references name a known alias.
///
/// Resolution is case-sensitive unless configured otherwise: `Name` does
/// not resolve to `name`, but the suggestion points out the case mismatch.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossReferenceResolver {
    case_sensitive: bool,
    similarity_floor: f64,
}

impl CrossReferenceResolver {
    /// Case-sensitive resolver with a similarity floor of 0.5.
    pub fn new() -> Self {
        Self {
            case_sensitive: true,
            similarity_floor: 0.5,
        }
    }

    /// Resolver configured from validator settings.
    pub fn from_config(config: &ValidatorConfig) -> Self {
        Self {
            case_sensitive: config.case_sensitive_aliases,
            similarity_floor: config.similarity_floor,
        }
    }

    /// Set whether references must match case exactly.
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Set the minimum similarity for a suggestion.
    pub fn with_similarity_floor(mut self, floor: f64) -> Self {
        self.similarity_floor = floor.clamp(0.0, 1.0);
        self
    }

    /// Whether references must match case exactly.
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Aliases bound by a section of expressions.
    pub fn extract_aliases(&self, section: &[Value]) -> IndexSet<String> {
        aliases::extract_aliases(section)
    }

    /// The known alias a reference resolves to, if any.
    pub fn resolve<'a>(&self, reference: &str, known: &'a IndexSet<String>) -> Option<&'a str> {
        if let Some(found) = known.get(reference) {
            return Some(found.as_str());
        }
        if self.case_sensitive {
            return None;
        }
        known
            .iter()
            .find(|alias| alias.eq_ignore_ascii_case(reference))
            .map(String::as_str)
    }

    /// Check one reference; returns the diagnostic for a miss.
    ///
    /// `field` names the referencing field in the message, `path` locates it.
    pub fn check_reference(
        &self,
        reference: &str,
        field: &str,
        path: &str,
        known: &IndexSet<String>,
    ) -> Option<Diagnostic> {
        if self.resolve(reference, known).is_some() {
            return None;
        }

        let mut available: Vec<&str> = known.iter().map(String::as_str).collect();
        available.sort_unstable();

        let suggestion = match known.iter().find(|alias| alias.eq_ignore_ascii_case(reference)) {
            Some(case_variant) => format!(
                "Did you mean \"{}\"? References are case-sensitive",
                case_variant
            ),
            None => match closest_match(reference, known.iter().map(String::as_str), self.similarity_floor) {
                Some(close) => format!("Did you mean \"{}\"?", close),
                None => NO_SIMILAR_ALIAS.to_string(),
            },
        };

        Some(
            Diagnostic::error(
                category::CROSS_REFERENCE,
                "undefined_alias",
                format!("Undefined reference \"{}\" in {}", reference, field),
            )
            .with_path(path)
            .with_suggestion(suggestion)
            .with_extra("reference", reference)
            .with_extra("available_aliases", available),
        )
    }

    /// Check the `field` of every entry in a section.
    ///
    /// Entries that are not mappings, or whose field is absent or not a
    /// string, are left to the structural rules.
    pub fn check_references(
        &self,
        section: &[Value],
        field: &str,
        base_path: &str,
        known: &IndexSet<String>,
    ) -> Vec<Diagnostic> {
        section
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let reference = entry.get(field)?.as_str()?;
                let path = format!("{}[{}].{}", base_path, index, field);
                self.check_reference(reference, field, &path, known)
            })
            .collect()
    }
}

impl Default for CrossReferenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(names: &[&str]) -> IndexSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn entry(alias: &str) -> Value {
        let mut map = indexmap::IndexMap::new();
        map.insert("source_alias".to_string(), Value::from(alias));
        Value::Mapping(map)
    }

    #[test]
    fn test_resolve_is_case_sensitive_by_default() {
        let resolver = CrossReferenceResolver::new();
        let aliases = known(&["id", "name"]);
        assert_eq!(resolver.resolve("name", &aliases), Some("name"));
        assert_eq!(resolver.resolve("Name", &aliases), None);

        let relaxed = resolver.with_case_sensitive(false);
        assert_eq!(relaxed.resolve("Name", &aliases), Some("name"));
    }

    #[test]
    fn test_undefined_reference_diagnostic() {
        let resolver = CrossReferenceResolver::new();
        let aliases = known(&["name", "id"]);
        let diags = resolver.check_references(
            &[entry("id"), entry("desc")],
            "source_alias",
            "mappings[0].column_transformations",
            &aliases,
        );
        assert_eq!(diags.len(), 1);
        let diag = &diags[0];
        assert_eq!(diag.category, category::CROSS_REFERENCE);
        assert_eq!(diag.code, "undefined_alias");
        assert_eq!(diag.message, "Undefined reference \"desc\" in source_alias");
        assert_eq!(diag.path, "mappings[0].column_transformations[1].source_alias");
        assert_eq!(
            diag.extra.get("available_aliases"),
            Some(&Value::from(vec!["id", "name"]))
        );
        assert_eq!(diag.suggestion.as_deref(), Some(NO_SIMILAR_ALIAS));
    }

    #[test]
    fn test_suggests_nearest_alias() {
        let resolver = CrossReferenceResolver::new();
        let aliases = known(&["customer_name", "customer_id"]);
        let diag = resolver
            .check_reference("customer_nme", "source_alias", "p", &aliases)
            .unwrap();
        assert_eq!(diag.suggestion.as_deref(), Some("Did you mean \"customer_name\"?"));
    }

    #[test]
    fn test_case_mismatch_is_called_out() {
        let resolver = CrossReferenceResolver::new();
        let diag = resolver
            .check_reference("Name", "source_alias", "p", &known(&["name"]))
            .unwrap();
        assert!(diag.suggestion.unwrap().contains("case-sensitive"));
    }

    #[test]
    fn test_similarity_floor_limits_suggestions() {
        let strict = CrossReferenceResolver::new().with_similarity_floor(0.95);
        let diag = strict
            .check_reference("customer_nme", "source_alias", "p", &known(&["customer_name"]))
            .unwrap();
        assert_eq!(diag.suggestion.as_deref(), Some(NO_SIMILAR_ALIAS));
    }

    #[test]
    fn test_entries_without_reference_are_skipped() {
        let resolver = CrossReferenceResolver::new();
        let section = vec![Value::from("not a mapping"), Value::Mapping(Default::default())];
        assert!(resolver
            .check_references(&section, "source_alias", "x", &known(&[]))
            .is_empty());
    }
}
