//! Validation profiles: fixed rule-category selections.

use crate::core::error::MapguardError;
use crate::validation::rules::selector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named selection of rule categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Structure and operation parameters only.
    Structural,
    /// Structural plus cross references and quality advisories.
    #[default]
    Comprehensive,
    /// Comprehensive plus expression security and SQL shape.
    #[serde(rename = "sql")]
    SqlEnhanced,
    /// Comprehensive plus settings and document-wide checks, recorded in history.
    Job,
}

impl Profile {
    /// Every profile, narrowest first.
    pub const ALL: [Profile; 4] = [Profile::Structural, Profile::Comprehensive, Profile::SqlEnhanced, Profile::Job];

    /// Rule categories this profile selects.
    pub fn categories(self) -> &'static [&'static str] {
        const STRUCTURAL: &[&str] = &[selector::STRUCTURE, selector::OPERATIONS];
        const COMPREHENSIVE: &[&str] = &[
            selector::STRUCTURE,
            selector::OPERATIONS,
            selector::CROSS_REFERENCE,
            selector::QUALITY,
        ];
        const SQL: &[&str] = &[
            selector::STRUCTURE,
            selector::OPERATIONS,
            selector::CROSS_REFERENCE,
            selector::QUALITY,
            selector::SECURITY,
            selector::SQL,
        ];
        const JOB: &[&str] = &[
            selector::STRUCTURE,
            selector::OPERATIONS,
            selector::CROSS_REFERENCE,
            selector::QUALITY,
            selector::SETTINGS,
            selector::DOCUMENT,
        ];
        match self {
            Profile::Structural => STRUCTURAL,
            Profile::Comprehensive => COMPREHENSIVE,
            Profile::SqlEnhanced => SQL,
            Profile::Job => JOB,
        }
    }

    /// Whether outcomes of this profile go into the validator's history.
    pub fn records_history(self) -> bool {
        matches!(self, Profile::Job)
    }

    /// Name used on the command line and in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Structural => "structural",
            Profile::Comprehensive => "comprehensive",
            Profile::SqlEnhanced => "sql",
            Profile::Job => "job",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = MapguardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structural" | "structure" => Ok(Profile::Structural),
            "comprehensive" => Ok(Profile::Comprehensive),
            "sql" | "sql_enhanced" | "sql-enhanced" => Ok(Profile::SqlEnhanced),
            "job" => Ok(Profile::Job),
            other => Err(MapguardError::UnknownProfile(other.to_string())),
        }
    }
}
