//! Ordered signature table for unsafe expressions.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Class of threat a signature detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureKind {
    /// Statement stacking, set-operation injection, tautologies, timing attacks
    Injection,
    /// Stored procedures, shell access, file access
    CommandExec,
    /// Comment markers used to cut a statement short
    CommentEvasion,
    /// DDL or destructive DML inside an expression
    DangerousKeyword,
}

impl SignatureKind {
    /// Name used in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureKind::Injection => "injection",
            SignatureKind::CommandExec => "command_exec",
            SignatureKind::CommentEvasion => "comment_evasion",
            SignatureKind::DangerousKeyword => "dangerous_keyword",
        }
    }
}

impl fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named pattern that flags an expression as unsafe.
#[derive(Debug, Clone)]
pub struct SecuritySignature {
    /// Short identifier, e.g. `stacked_statement`.
    pub name: String,
    /// Threat class.
    pub kind: SignatureKind,
    /// What the pattern detects.
    pub description: String,
    /// Case-insensitive matcher.
    pub pattern: Regex,
}

impl SecuritySignature {
    /// Build a signature from a pattern. Matching is always case-insensitive.
    pub fn new(
        name: impl Into<String>,
        kind: SignatureKind,
        description: impl Into<String>,
        pattern: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            kind,
            description: description.into(),
            pattern: Regex::new(&format!("(?i){}", pattern))?,
        })
    }
}

const BUILTIN: &[(&str, SignatureKind, &str, &str)] = &[
    (
        "stacked_statement",
        SignatureKind::Injection,
        "statement terminator followed by a destructive statement",
        r";\s*(drop|delete|truncate|insert|update|create|alter)\b",
    ),
    (
        "union_select",
        SignatureKind::Injection,
        "set operation appending a second query",
        r"\b(union(\s+all)?|intersect|except)\s+select\b",
    ),
    ("line_comment", SignatureKind::CommentEvasion, "line comment marker", r"--"),
    ("block_comment", SignatureKind::CommentEvasion, "block comment marker", r"/\*"),
    ("exec_keyword", SignatureKind::CommandExec, "dynamic execution keyword", r"\bexec(ute)?\b"),
    ("xp_cmdshell", SignatureKind::CommandExec, "operating system shell access", r"\bxp_cmdshell\b"),
    (
        "system_procedure",
        SignatureKind::CommandExec,
        "system or extended stored procedure",
        r"\b(sp|xp)_\w+",
    ),
    (
        "ddl_statement",
        SignatureKind::DangerousKeyword,
        "schema-changing statement",
        r"\b(drop|create|alter|truncate)\s+(table|database|schema|view|index|user|procedure|function)\b",
    ),
    ("delete_from", SignatureKind::DangerousKeyword, "row deletion", r"\bdelete\s+from\b"),
    (
        "file_access",
        SignatureKind::CommandExec,
        "server-side file read or write",
        r"\binto\s+(out|dump)file\b|\bload_file\s*\(",
    ),
    (
        "time_delay",
        SignatureKind::Injection,
        "timing attack primitive",
        r"\bwaitfor\s+delay\b|\b(benchmark|sleep|pg_sleep)\s*\(",
    ),
    (
        "external_data_source",
        SignatureKind::CommandExec,
        "ad hoc connection to an external data source",
        r"\b(openrowset|opendatasource)\b",
    ),
    (
        "tautology",
        SignatureKind::Injection,
        "always-true condition after a closing quote",
        r"'\s*or\s+'?\d+'?\s*=\s*'?\d+",
    ),
];

static SIGNATURES: Lazy<Vec<SecuritySignature>> = Lazy::new(|| {
    BUILTIN
        .iter()
        .map(|(name, kind, description, pattern)| {
            SecuritySignature::new(*name, *kind, *description, pattern).expect("invalid built-in signature pattern")
        })
        .collect()
});

/// The built-in signatures, in reporting order.
pub fn builtin_signatures() -> &'static [SecuritySignature] {
    &SIGNATURES
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matching(text: &str) -> Vec<&'static str> {
        builtin_signatures()
            .iter()
            .filter(|s| s.pattern.is_match(text))
            .map(|s| s.name.as_str())
            .collect()
    }

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(builtin_signatures().len(), BUILTIN.len());
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = BUILTIN.iter().map(|b| b.0).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), BUILTIN.len());
    }

    #[test]
    fn test_stacked_drop() {
        let hits = matching("id; DROP TABLE users; --");
        assert_eq!(hits, vec!["stacked_statement", "line_comment", "ddl_statement"]);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(matching("email uNiOn SeLeCt password"), vec!["union_select"]);
        assert_eq!(matching("EXEC('x')"), vec!["exec_keyword"]);
    }

    #[test]
    fn test_word_boundaries() {
        assert!(matching("executive_name").is_empty());
        assert!(matching("created_by").is_empty());
        assert!(matching("droplet_count").is_empty());
        assert!(matching("last_update").is_empty());
    }

    #[test]
    fn test_command_exec_family() {
        assert_eq!(
            matching("xp_cmdshell('dir')"),
            vec!["xp_cmdshell", "system_procedure"]
        );
        assert_eq!(matching("LOAD_FILE('/etc/passwd')"), vec!["file_access"]);
        assert_eq!(matching("openrowset('SQLOLEDB', 'x')"), vec!["external_data_source"]);
        assert_eq!(matching("pg_sleep(10)"), vec!["time_delay"]);
    }

    #[test]
    fn test_tautology() {
        assert_eq!(matching("name' OR '1'='1"), vec!["tautology"]);
        assert_eq!(matching("x' or 1 = 1"), vec!["tautology"]);
    }
}
