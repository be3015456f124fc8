//! # Mapguard - ETL mapping configuration validator
//!
//! Mapguard checks ETL "mapping" job descriptions before they reach an
//! execution engine. A job document mixes declarative sections (column
//! lists, table names, partition settings) with embedded SQL-like
//! expressions; Mapguard reports structural mistakes, dangling alias
//! references, bad operation calls and unsafe expressions as diagnostics.
//!
//! ## Features
//!
//! - **Rule engine**: rules are plain data, selected by category and isolated
//!   from each other's failures
//! - **Operation registry**: typed parameter specs with LRU-cached lookups and
//!   "did you mean" suggestions
//! - **Expression security**: whole-expression allow-list first, then
//!   signature scanning for injection and command execution
//! - **Cross references**: aliases extracted from source columns, checked
//!   wherever a mapping refers back to them
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mapguard::prelude::*;
//!
//! let document = ConfigDocument::from_yaml_str(&std::fs::read_to_string("job.yaml")?)?;
//! let validators = Validators::new();
//!
//! let result = validators.validate(&document, Profile::Job);
//! println!("{}", result.summary());
//! for line in result.detailed_errors() {
//!     println!("{}", line);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: document tree, diagnostics and results, configuration, logging
//! - [`operations`]: operation specs, built-in catalogue and the registry
//! - [`security`]: expression classifier
//! - [`references`]: alias extraction and reference resolution
//! - [`validation`]: rule engine, built-in rules, profiles and history
//!
//! ## Custom rules
//!
//! ```rust,ignore
//! use mapguard::prelude::*;
//!
//! let validators = Validators::builder()
//!     .rule(RuleDescriptor::new(
//!         "no_staging_targets",
//!         "Targets never point at staging tables",
//!         Severity::Error,
//!         ["structure"],
//!         |ctx| {
//!             Ok(ctx
//!                 .mappings()
//!                 .filter(|m| m.get("target_table").and_then(Value::as_str).is_some_and(|t| t.starts_with("stg.")))
//!                 .map(|m| Diagnostic::error("structural", "staging_target", "Target is a staging table").with_path(m.field_path("target_table")))
//!                 .collect())
//!         },
//!     ))
//!     .build();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod operations;
pub mod references;
pub mod security;
pub mod validation;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use mapguard::prelude::*;
/// ```
pub mod prelude {
    // Document and results
    pub use crate::core::types::{ConfigDocument, Value};
    pub use crate::core::result::{category, Diagnostic, ResultBuilder, Severity, ValidationResult};
    pub use crate::core::context::{MappingView, ValidationContext};

    // Configuration, errors and logging
    pub use crate::core::config::{CacheConfig, ValidatorConfig};
    pub use crate::core::error::{ConfigError, MapguardError, RuleError, RuleResult};
    pub use crate::core::logger::{LogFacade, MemoryLogger, SilentLogger, ValidationLogger};

    // Operations
    pub use crate::operations::registry::{OperationRegistry, RegistryBuilder};
    pub use crate::operations::spec::{Constraint, OperationSpec, ParameterSpec, ParameterType};

    // Expressions and references
    pub use crate::references::resolver::CrossReferenceResolver;
    pub use crate::security::classifier::{Classification, ExpressionSecurityClassifier};

    // Validation
    pub use crate::validation::engine::{RuleDescriptor, RuleEngine};
    pub use crate::validation::profiles::Profile;
    pub use crate::validation::report::ValidationReport;
    pub use crate::validation::validators::Validators;
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
