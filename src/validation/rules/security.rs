//! Expression rules: signature scanning and SQL expression shape.

use super::{excerpt, operation_sites, selector, RuleServices};
use crate::core::context::{MappingView, ValidationContext};
use crate::core::result::{category, Diagnostic, Severity};
use crate::operations::spec::ParameterType;
use crate::references::aliases::extract_alias;
use crate::security::allowlist::mask_literals;
use crate::security::classifier::{Classification, ExpressionSecurityClassifier};
use crate::validation::engine::RuleDescriptor;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static CASE_EXPRESSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bcase\b.*\bend\b").expect("invalid case expression pattern"));

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("invalid identifier pattern"));

static QUOTED_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(?:[^"]|"")*""#).expect("invalid quoted identifier pattern"));

/// Kind of a source column expression, as far as aliasing rules care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExpressionKind {
    Simple,
    Case,
    Concatenation,
    Mathematical,
    FunctionCall,
}

impl ExpressionKind {
    fn of(expression: &str) -> Self {
        let masked = mask_literals(expression);
        if CASE_EXPRESSION.is_match(&masked) {
            ExpressionKind::Case
        } else if masked.contains("||") {
            ExpressionKind::Concatenation
        } else if masked.contains(['+', '-', '*', '/']) {
            ExpressionKind::Mathematical
        } else if masked.contains('(') && masked.contains(')') {
            ExpressionKind::FunctionCall
        } else {
            ExpressionKind::Simple
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ExpressionKind::Simple => "simple",
            ExpressionKind::Case => "case",
            ExpressionKind::Concatenation => "concatenation",
            ExpressionKind::Mathematical => "mathematical",
            ExpressionKind::FunctionCall => "function_call",
        }
    }
}

/// Deepest parenthesis nesting outside string literals.
fn nesting_depth(masked: &str) -> usize {
    let mut depth = 0_usize;
    let mut deepest = 0;
    for c in masked.chars() {
        match c {
            '(' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

fn source_expressions<'a>(view: &MappingView<'a>) -> impl Iterator<Item = (usize, &'a str)> + 'a {
    view.list("source_columns_interested")
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| entry.as_str().map(|text| (i, text)))
}

fn security_findings(classification: &Classification, path: &str, mapping: &str, out: &mut Vec<Diagnostic>) {
    if classification.is_unsafe {
        let names: Vec<&str> = classification.matches.iter().map(|m| m.name.as_str()).collect();
        let kinds: Vec<&str> = classification.matches.iter().map(|m| m.kind.as_str()).collect();
        out.push(
            Diagnostic::error(
                category::SECURITY,
                "unsafe_expression",
                format!(
                    "Unsafe expression \"{}\" matches: {}",
                    excerpt(&classification.expression),
                    names.join(", ")
                ),
            )
            .with_severity(Severity::Critical)
            .with_path(path)
            .with_mapping(mapping)
            .with_suggestion("Remove statement separators, comments and system routines from the expression")
            .with_extra("signatures", names)
            .with_extra("kinds", kinds),
        );
    }
    for note in &classification.notes {
        out.push(
            Diagnostic::warning(
                category::SECURITY,
                "incomplete_classification",
                format!("Expression \"{}\": {}", excerpt(&classification.expression), note),
            )
            .with_path(path)
            .with_mapping(mapping)
            .with_suggestion("Close every quote so the expression can be checked fully"),
        );
    }
}

fn classify_sites(
    view: &MappingView<'_>,
    services: &RuleServices,
    classifier: &ExpressionSecurityClassifier,
    out: &mut Vec<Diagnostic>,
) {
    let mapping = view.name();
    for (i, text) in source_expressions(view) {
        let path = format!("{}[{}]", view.field_path("source_columns_interested"), i);
        security_findings(&classifier.classify(text), &path, &mapping, out);
    }

    for site in operation_sites(view) {
        let Some(spec) = site.op_type().and_then(|name| services.registry.get(name)) else {
            continue;
        };
        for param in spec.parameters.values().filter(|p| p.param_type == ParameterType::SqlExpression) {
            let Some(value) = site.parameter(&param.name) else {
                continue;
            };
            let path = format!("{}.parameters.{}", site.path, param.name);
            security_findings(&classifier.classify_value(value), &path, &mapping, out);
        }
    }
}

/// Every expression-bearing field is classified.
pub fn expression_security(services: &RuleServices) -> RuleDescriptor {
    let services = services.clone();
    RuleDescriptor::new(
        "expression_security",
        "Source expressions and SQL parameters carry no injection signatures",
        Severity::Critical,
        [selector::SECURITY],
        move |ctx: &mut ValidationContext<'_>| {
            let mut diagnostics = Vec::new();
            for view in ctx.mappings() {
                classify_sites(&view, &services, &services.classifier, &mut diagnostics);
            }
            Ok(diagnostics)
        },
    )
}

/// Aliasing, balance and complexity of source column expressions.
pub fn expression_shape(services: &RuleServices) -> RuleDescriptor {
    let config = Arc::clone(&services.config);
    RuleDescriptor::new(
        "expression_shape",
        "Complex source expressions are aliased, balanced and readable",
        Severity::Error,
        [selector::SQL],
        move |ctx: &mut ValidationContext<'_>| {
            let mut diagnostics = Vec::new();
            for view in ctx.mappings() {
                let mapping = view.name();
                for (i, text) in source_expressions(&view) {
                    let path = format!("{}[{}]", view.field_path("source_columns_interested"), i);
                    let found = check_expression(text, config.max_expression_length, config.max_nesting_depth);
                    diagnostics.extend(
                        found
                            .into_iter()
                            .map(|d| d.with_path(path.clone()).with_mapping(mapping.clone())),
                    );
                }
            }
            Ok(diagnostics)
        },
    )
}

fn check_expression(text: &str, max_length: usize, max_depth: usize) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let kind = ExpressionKind::of(text);
    let alias = extract_alias(text);

    if kind != ExpressionKind::Simple {
        match &alias {
            None => out.push(
                Diagnostic::error(
                    category::STRUCTURAL,
                    "sql_expression_missing_alias",
                    format!("{} expression is missing an alias: \"{}\"", kind.as_str(), excerpt(text)),
                )
                .with_suggestion(format!("Add \"as alias_name\" to the {} expression", kind.as_str()))
                .with_extra("expression_type", kind.as_str()),
            ),
            Some(alias) if !IDENTIFIER.is_match(alias) => out.push(
                Diagnostic::error(
                    category::STRUCTURAL,
                    "invalid_alias_name",
                    format!("Invalid alias name \"{}\" for {} expression", alias, kind.as_str()),
                )
                .with_suggestion("Use letters, numbers and underscores only, starting with a letter or underscore")
                .with_extra("alias", alias.as_str()),
            ),
            Some(_) => {}
        }
    }

    let masked = mask_literals(text);
    let stray_single = masked.replace("''", "").contains('\'');
    if masked.matches('"').count() % 2 != 0 || stray_single {
        out.push(
            Diagnostic::error(category::STRUCTURAL, "unbalanced_quotes", format!("Unbalanced quotes in expression: \"{}\"", excerpt(text)))
                .with_suggestion("Ensure all quotes are properly paired"),
        );
    }
    if masked.matches('(').count() != masked.matches(')').count() {
        out.push(
            Diagnostic::error(
                category::STRUCTURAL,
                "unbalanced_parentheses",
                format!("Unbalanced parentheses in expression: \"{}\"", excerpt(text)),
            )
            .with_suggestion("Ensure all parentheses are properly paired"),
        );
    }

    for quoted in QUOTED_IDENTIFIER.find_iter(&masked).map(|m| m.as_str()) {
        let inner = &quoted[1..quoted.len() - 1];
        if inner.trim().is_empty() {
            out.push(
                Diagnostic::warning(category::STRUCTURAL, "empty_quoted_identifier", format!("Empty quoted identifier: {}", quoted))
                    .with_suggestion("Remove empty quoted identifiers or add content"),
            );
        } else if inner.contains('"') {
            out.push(
                Diagnostic::warning(
                    category::STRUCTURAL,
                    "nested_quotes_in_identifier",
                    format!("Nested quotes in identifier may need escaping: {}", quoted),
                )
                .with_suggestion("Ensure nested quotes are escaped by doubling them"),
            );
        }
    }

    let depth = nesting_depth(&masked);
    if text.chars().count() > max_length && depth > max_depth {
        out.push(
            Diagnostic::warning(
                category::QUALITY,
                "sql_complexity_warning",
                format!("Expression of {} characters nests {} levels deep", text.chars().count(), depth),
            )
            .with_suggestion("Break the expression into smaller aliased parts")
            .with_extra("nesting_level", depth),
        );
    }
    out
}
