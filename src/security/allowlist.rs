//! Whole-expression shapes known to be benign.
//!
//! A shape only counts when it matches the entire normalized expression.
//! Even then, an expression is refused if anything outside its string
//! literals looks like a statement break, a comment or a dangerous routine.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

const LITERAL: &str = r"'(?:[^']|'')*'";
const NUMBER: &str = r"[-+]?\d+(?:\.\d+)?";
const NAME: &str = r#"(?:[A-Za-z_][A-Za-z0-9_]*|"[^"]+")"#;

fn column() -> String {
    format!(r"{NAME}(?:\.{NAME})*")
}

fn alias() -> String {
    format!(r"(?:\s+as\s+{NAME})")
}

fn shape_patterns() -> Vec<(&'static str, String)> {
    let column = column();
    let alias = alias();
    let argument = format!(r"(?:{column}|{LITERAL}|{NUMBER}|\*)");
    vec![
        ("literal", format!(r"^(?:{LITERAL}|{NUMBER}){alias}?$")),
        ("column", format!(r"^{column}{alias}?$")),
        ("case_expression", format!(r"^case\s+when\s.+\send{alias}?$")),
        (
            "function_call",
            format!(r"^[A-Za-z_][A-Za-z0-9_]*\s*\(\s*(?:{argument}(?:\s*,\s*{argument})*)?\s*\){alias}?$"),
        ),
    ]
}

static SHAPES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    shape_patterns()
        .into_iter()
        .map(|(name, pattern)| {
            let regex = Regex::new(&format!("(?is){}", pattern)).expect("invalid allow-list pattern");
            (name, regex)
        })
        .collect()
});

static LITERALS: Lazy<Regex> = Lazy::new(|| Regex::new(LITERAL).expect("invalid literal pattern"));

static GUARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i);|--|/\*|\b(select|drop|delete|truncate|alter|insert|update|union)\b|\b(exec|execute|xp_\w+|sp_\w+|load_file|sleep|pg_sleep|benchmark|waitfor|openrowset|opendatasource)\b",
    )
    .expect("invalid allow-list guard pattern")
});

/// Replace every complete string literal with `''`.
pub fn mask_literals(text: &str) -> Cow<'_, str> {
    LITERALS.replace_all(text, "''")
}

/// Name of the benign shape the whole expression matches, if any.
///
/// `normalized` must already be trimmed with whitespace collapsed.
pub fn matching_shape(normalized: &str) -> Option<&'static str> {
    if GUARD.is_match(&mask_literals(normalized)) {
        return None;
    }
    SHAPES
        .iter()
        .find(|(_, regex)| regex.is_match(normalized))
        .map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_compile() {
        assert_eq!(SHAPES.len(), shape_patterns().len());
        assert!(LITERALS.is_match("'x'"));
        assert!(GUARD.is_match(";"));
    }

    #[test]
    fn test_literal_with_alias() {
        assert_eq!(matching_shape("'gdx_user' AS created_by"), Some("literal"));
        assert_eq!(matching_shape("'it''s' as quoted"), Some("literal"));
        assert_eq!(matching_shape("0 as zero"), Some("literal"));
        assert_eq!(matching_shape("'--' as dashes"), Some("literal"));
    }

    #[test]
    fn test_columns() {
        assert_eq!(matching_shape("customer_id"), Some("column"));
        assert_eq!(matching_shape("customer_id as id"), Some("column"));
        assert_eq!(matching_shape(r#"t."Order Date" AS order_date"#), Some("column"));
        assert_eq!(matching_shape("id name"), None);
    }

    #[test]
    fn test_case_and_functions() {
        assert_eq!(
            matching_shape("CASE WHEN status = 'active' THEN 1 ELSE 0 END as is_active"),
            Some("case_expression")
        );
        assert_eq!(matching_shape("UPPER(customer_name) as name"), Some("function_call"));
        assert_eq!(
            matching_shape("COALESCE(email, 'no-email@example.com') as email"),
            Some("function_call")
        );
        assert_eq!(matching_shape("COUNT(*)"), Some("function_call"));
        assert_eq!(matching_shape("UPPER(TRIM(name))"), None);
    }

    #[test]
    fn test_guard_rejects_hidden_payloads() {
        assert_eq!(matching_shape("id; DROP TABLE users; --"), None);
        assert_eq!(matching_shape("xp_cmdshell('dir') as out"), None);
        assert_eq!(matching_shape("sleep(10) as s"), None);
        assert_eq!(
            matching_shape("CASE WHEN 1=1 THEN (SELECT password FROM users) END as p"),
            None
        );
        assert_eq!(matching_shape("CASE WHEN a = 1 THEN 1 END -- trailing"), None);
        assert_eq!(matching_shape("CASE WHEN 1=1 THEN DROP TABLE users END"), None);
        assert_eq!(matching_shape("CASE WHEN a = 1 THEN delete ELSE b END as x"), None);
        assert_eq!(matching_shape("CASE WHEN last_update = 1 THEN 'drop' END as x"), Some("case_expression"));
    }

    #[test]
    fn test_mask_literals() {
        assert_eq!(mask_literals("a = 'x; y' and b = 'it''s'"), "a = '' and b = ''");
        assert_eq!(mask_literals("no literals"), "no literals");
    }
}
