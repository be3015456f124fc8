//! Error types for Mapguard.
//!
//! Uses thiserror for structured errors with context. Validation findings are
//! never errors: they travel as diagnostics inside a `ValidationResult`. The
//! types here cover the few things that can genuinely fail:
//! - Loading and parsing input documents and configuration
//! - A rule implementation reporting that it could not run

use thiserror::Error;

/// Top-level error type for Mapguard.
#[derive(Error, Debug)]
pub enum MapguardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Document root must be a mapping, found {found}")]
    Document { found: String },

    #[error("Unknown validation profile '{0}'")]
    UnknownProfile(String),
}

impl MapguardError {
    /// Get a suggested fix for this error.
    pub fn suggested_fix(&self) -> Option<String> {
        match self {
            MapguardError::Yaml(_) => {
                Some("Check indentation and quoting in the YAML file".to_string())
            }
            MapguardError::Document { .. } => Some(
                "The file must start with top-level keys such as 'settings' and 'mappings'"
                    .to_string(),
            ),
            MapguardError::Config(err) => err.suggested_fix(),
            MapguardError::UnknownProfile(_) => {
                Some("Use one of: structural, comprehensive, sql, job".to_string())
            }
            _ => None,
        }
    }
}

/// Errors raised while loading a validator configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration syntax: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    /// Get a suggested fix for this error.
    pub fn suggested_fix(&self) -> Option<String> {
        match self {
            ConfigError::Invalid { field, .. } => {
                Some(format!("Adjust '{}' or remove it to use the default", field))
            }
            ConfigError::Parse(_) => Some("The configuration file must be valid TOML".to_string()),
            ConfigError::Io(_) => None,
        }
    }
}

/// Failure reported by a rule implementation.
///
/// The rule engine turns these into a single critical diagnostic; they never
/// escape a validation call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("{0}")]
    Failed(String),

    #[error("Expected {expected} at '{path}'")]
    MalformedNode { path: String, expected: String },
}

impl RuleError {
    /// Create a generic rule failure.
    pub fn failed(message: impl Into<String>) -> Self {
        RuleError::Failed(message.into())
    }
}

/// Result type alias for rule functions.
pub type RuleResult<T> = Result<T, RuleError>;
