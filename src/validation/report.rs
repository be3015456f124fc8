//! Programmatic validation report.

use crate::core::result::ValidationResult;
use crate::validation::profiles::Profile;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// A condensed view of one validation result.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// `"passed"` or `"failed"`.
    pub status: &'static str,
    /// Profile that produced the result.
    pub profile: Profile,
    /// Whether the result is valid.
    pub is_valid: bool,
    /// Number of errors.
    pub error_count: usize,
    /// Number of warnings.
    pub warning_count: usize,
    /// Number of informational diagnostics.
    pub info_count: usize,
    /// Number of critical errors.
    pub critical_count: usize,
    /// Mappings with at least one diagnostic.
    pub affected_mappings: Vec<String>,
    /// Error counts per code.
    pub error_summary: IndexMap<String, usize>,
    /// Warning counts per code.
    pub warning_summary: IndexMap<String, usize>,
    /// Unique suggestions, in order.
    pub suggestions: Vec<String>,
    /// Entries currently held in the validator's history.
    pub history_count: usize,
    /// When the report was produced.
    pub timestamp: DateTime<Utc>,
}

impl ValidationReport {
    /// Summarize a result.
    pub fn from_result(result: &ValidationResult, profile: Profile, history_count: usize) -> Self {
        let is_valid = result.is_valid();
        Self {
            status: if is_valid { "passed" } else { "failed" },
            profile,
            is_valid,
            error_count: result.errors.len(),
            warning_count: result.warnings.len(),
            info_count: result.info.len(),
            critical_count: result.critical_errors().len(),
            affected_mappings: result.affected_mappings(),
            error_summary: result.error_summary(),
            warning_summary: result.warning_summary(),
            suggestions: result.suggestions(),
            history_count,
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({}): {} error(s), {} warning(s)",
            self.status, self.profile, self.error_count, self.warning_count
        )?;
        for (code, count) in &self.error_summary {
            writeln!(f, "  error   {:<36} x{}", code, count)?;
        }
        for (code, count) in &self.warning_summary {
            writeln!(f, "  warning {:<36} x{}", code, count)?;
        }
        if !self.affected_mappings.is_empty() {
            writeln!(f, "  mappings: {}", self.affected_mappings.join(", "))?;
        }
        Ok(())
    }
}
