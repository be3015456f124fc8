//! Validator configuration.
//!
//! Every field has a default, so an empty TOML file (or no file at all) is a
//! valid configuration.

use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for a `Validators` instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// How many job-level outcomes the history keeps.
    pub history_capacity: usize,
    /// Minimum similarity (0.0..=1.0) for an alias suggestion.
    pub similarity_floor: f64,
    /// Whether alias references must match case exactly.
    pub case_sensitive_aliases: bool,
    /// Transformation chains longer than this produce a warning.
    pub max_chain_length: usize,
    /// Arithmetic chains longer than this produce an info note.
    pub max_arithmetic_chain: usize,
    /// Expressions longer than this are checked for deep nesting.
    pub max_expression_length: usize,
    /// Nesting depth above which a long expression is flagged.
    pub max_nesting_depth: usize,
    /// Registry lookup cache sizes.
    pub cache: CacheConfig,
}

/// Capacities of the registry's lookup caches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries in the by-name cache.
    pub operation_capacity: usize,
    /// Entries in the by-category cache.
    pub category_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            operation_capacity: 128,
            category_capacity: 64,
        }
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            history_capacity: 50,
            similarity_floor: 0.5,
            case_sensitive_aliases: true,
            max_chain_length: 5,
            max_arithmetic_chain: 3,
            max_expression_length: 1000,
            max_nesting_depth: 10,
            cache: CacheConfig::default(),
        }
    }
}

impl ValidatorConfig {
    /// Parse a TOML string and check the values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file and check the values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject values the validators cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_capacity("history_capacity", self.history_capacity, MAX_HISTORY_CAPACITY)?;
        if !(0.0..=1.0).contains(&self.similarity_floor) {
            return Err(invalid("similarity_floor", "must be between 0.0 and 1.0"));
        }
        check_capacity("cache.operation_capacity", self.cache.operation_capacity, MAX_CACHE_CAPACITY)?;
        check_capacity("cache.category_capacity", self.cache.category_capacity, MAX_CACHE_CAPACITY)?;
        Ok(())
    }
}

/// Largest accepted `history_capacity`.
pub const MAX_HISTORY_CAPACITY: usize = 10_000;

/// Largest accepted registry cache capacity.
pub const MAX_CACHE_CAPACITY: usize = 100_000;

fn check_capacity(field: &str, value: usize, max: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(field, "must be at least 1"));
    }
    if value > max {
        return Err(invalid(field, &format!("must be at most {}", max)));
    }
    Ok(())
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ValidatorConfig::from_toml_str("").unwrap();
        assert_eq!(config, ValidatorConfig::default());
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.cache.operation_capacity, 128);
    }

    #[test]
    fn test_partial_override() {
        let config = ValidatorConfig::from_toml_str(
            "history_capacity = 5\n[cache]\ncategory_capacity = 8\n",
        )
        .unwrap();
        assert_eq!(config.history_capacity, 5);
        assert_eq!(config.cache.category_capacity, 8);
        assert_eq!(config.cache.operation_capacity, 128);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = ValidatorConfig::from_toml_str("similarity_floor = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "similarity_floor"));
        assert!(ValidatorConfig::from_toml_str("history_capacity = 0").is_err());
    }

    #[test]
    fn test_rejects_oversized_capacities() {
        let err = ValidatorConfig::from_toml_str("history_capacity = 1000000000000").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "history_capacity"));
        let err = ValidatorConfig::from_toml_str("[cache]\noperation_capacity = 1000000000000").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "cache.operation_capacity"));
        assert!(ValidatorConfig::from_toml_str("[cache]\ncategory_capacity = 100001").is_err());
        assert!(ValidatorConfig::from_toml_str("history_capacity = 10000").is_ok());
    }

    #[test]
    fn test_rejects_bad_syntax() {
        let err = ValidatorConfig::from_toml_str("history_capacity = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "case_sensitive_aliases = false").unwrap();
        let config = ValidatorConfig::from_file(file.path()).unwrap();
        assert!(!config.case_sensitive_aliases);
    }
}
