//! Alias extraction from source-column expressions.
//!
//! An entry such as `UPPER(name) AS customer_name` binds the alias
//! `customer_name`. Without an `AS` clause the bare trailing identifier is
//! used (`t.customer_id` gives `customer_id`, `count(*) total` gives
//! `total`). Entries with neither contribute nothing.

use crate::core::types::Value;
use crate::security::normalize;
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;

static AS_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\sas\s+(?:"([^"]+)"|([A-Za-z_][A-Za-z0-9_]*))$"#).expect("invalid AS clause pattern")
});

static COLUMN_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:(?:[A-Za-z_][A-Za-z0-9_]*|"[^"]+")\.)*(?:([A-Za-z_][A-Za-z0-9_]*)|"([^"]+)")$"#)
        .expect("invalid column reference pattern")
});

static TRAILING_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[\w')"]\s+([A-Za-z_][A-Za-z0-9_]*)$"#).expect("invalid trailing identifier pattern")
});

/// Words that end an expression without naming it.
const RESERVED: [&str; 14] = [
    "end", "null", "and", "or", "not", "then", "else", "when", "case", "is", "in", "like", "between", "distinct",
];

fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(word))
}

/// The alias one expression binds, if any.
pub fn extract_alias(expression: &str) -> Option<String> {
    let normalized = normalize(expression);
    if normalized.is_empty() {
        return None;
    }

    if let Some(caps) = AS_CLAUSE.captures(&normalized) {
        return caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string());
    }

    if let Some(caps) = COLUMN_REFERENCE.captures(&normalized) {
        return caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string());
    }

    TRAILING_IDENTIFIER
        .captures(&normalized)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|word| !is_reserved(word))
        .map(str::to_string)
}

/// Aliases bound by a section of expressions, in first-seen order.
///
/// Non-string entries are skipped.
pub fn extract_aliases(section: &[Value]) -> IndexSet<String> {
    section
        .iter()
        .filter_map(Value::as_str)
        .filter_map(extract_alias)
        .collect()
}
