//! Transformation operations and the registry that validates their calls.

pub mod builtin;
pub mod cache;
pub mod registry;
pub mod spec;

pub use cache::{CacheStats, LookupCache};
pub use registry::{CallReport, OperationRegistry, RegistryBuilder, RegistryStats, DEFAULT_SUGGESTION_LIMIT};
pub use spec::{CallCheck, Constraint, OperationSpec, OperationSpecBuilder, ParameterSpec, ParameterType, Violation};
