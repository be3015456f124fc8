//! Core types shared by every component.

pub mod config;
pub mod context;
pub mod error;
pub mod logger;
pub mod result;
pub mod similarity;
pub mod types;

pub use config::{CacheConfig, ValidatorConfig};
pub use context::{MappingView, ValidationContext};
pub use error::{ConfigError, MapguardError, RuleError, RuleResult};
pub use logger::{LogFacade, LogLevel, MemoryLogger, SilentLogger, ValidationLogger};
pub use result::{category, Diagnostic, DiagnosticKind, ResultBuilder, Severity, ValidationResult};
pub use types::{ConfigDocument, Value};
