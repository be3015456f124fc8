//! Operation registry for managing available transformation operations.
//!
//! The registry is shared between concurrent validation passes. Lookups go
//! through two bounded LRU caches (by name and by category). Registration
//! takes the write lock and invalidates the affected cache entries before
//! releasing it, so a reader can never repopulate a cache from stale data.

use crate::core::config::CacheConfig;
use crate::core::result::{category, Diagnostic};
use crate::core::similarity::{closest_match, is_subsequence, levenshtein};
use crate::core::types::Value;
use crate::operations::cache::{CacheStats, LookupCache};
use crate::operations::spec::{OperationSpec, ParameterSpec};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;

/// Default number of suggestions returned by [`OperationRegistry::suggest`].
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

struct Inner {
    /// Operations indexed by name, in registration order.
    operations: IndexMap<String, Arc<OperationSpec>>,
    /// Operation names grouped by category.
    categories: IndexMap<String, Vec<String>>,
}

/// Registry for all available operation types.
pub struct OperationRegistry {
    inner: RwLock<Inner>,
    by_name: LookupCache<String, Option<Arc<OperationSpec>>>,
    by_category: LookupCache<String, Vec<Arc<OperationSpec>>>,
}

/// Outcome of checking one operation call against its spec.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CallReport {
    /// Problems that make the call invalid.
    pub errors: Vec<Diagnostic>,
    /// Tolerated problems, such as unknown parameters.
    pub warnings: Vec<Diagnostic>,
    /// Accepted parameters with defaults substituted for absent optional ones.
    pub filled: IndexMap<String, Value>,
}

impl CallReport {
    /// True when no errors were found.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors followed by warnings.
    pub fn into_diagnostics(self) -> impl Iterator<Item = Diagnostic> {
        self.errors.into_iter().chain(self.warnings)
    }
}

/// Hit/miss statistics of both lookup caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// By-name cache.
    pub operations: CacheStats,
    /// By-category cache.
    pub categories: CacheStats,
}

impl OperationRegistry {
    /// Create a new empty registry with default cache sizes.
    pub fn new() -> Self {
        Self::with_cache_config(&CacheConfig::default())
    }

    /// Create a new empty registry with the given cache sizes.
    pub fn with_cache_config(config: &CacheConfig) -> Self {
        Self {
            inner: RwLock::new(Inner {
                operations: IndexMap::new(),
                categories: IndexMap::new(),
            }),
            by_name: LookupCache::new(config.operation_capacity),
            by_category: LookupCache::new(config.category_capacity),
        }
    }

    /// Create a registry pre-populated with built-in operations.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        crate::operations::builtin::register_all(&registry);
        registry
    }

    /// Register an operation, replacing any spec with the same name.
    ///
    /// Returns the replaced spec, if there was one. A replaced operation keeps
    /// its position in registration order.
    pub fn register(&self, spec: OperationSpec) -> Option<Arc<OperationSpec>> {
        let mut inner = self.inner.write();
        let name = spec.name.clone();
        let new_category = spec.category.clone();
        let previous = inner.operations.insert(name.clone(), Arc::new(spec));

        if let Some(old) = &previous {
            if old.category != new_category {
                if let Some(names) = inner.categories.get_mut(&old.category) {
                    names.retain(|n| n != &name);
                }
            }
        }

        let names = inner.categories.entry(new_category).or_default();
        if !names.contains(&name) {
            names.push(name.clone());
        }

        // category membership may have changed, so every category entry goes
        self.by_name.invalidate(&name);
        self.by_category.clear();

        previous
    }

    /// Look up an operation by exact name.
    pub fn get(&self, name: &str) -> Option<Arc<OperationSpec>> {
        let inner = self.inner.read();
        let key = name.to_string();
        if let Some(cached) = self.by_name.get(&key) {
            return cached;
        }
        let found = inner.operations.get(name).cloned();
        self.by_name.put(key, found.clone());
        found
    }

    /// Operations of one category, in registration order.
    pub fn get_by_category(&self, category: &str) -> Vec<Arc<OperationSpec>> {
        let inner = self.inner.read();
        let key = category.to_string();
        if let Some(cached) = self.by_category.get(&key) {
            return cached;
        }
        let specs: Vec<Arc<OperationSpec>> = inner
            .categories
            .get(category)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| inner.operations.get(n).cloned())
                    .collect()
            })
            .unwrap_or_default();
        self.by_category.put(key, specs.clone());
        specs
    }

    /// Check if an operation is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().operations.contains_key(name)
    }

    /// All operation names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.inner.read().operations.keys().cloned().collect()
    }

    /// All categories, in first-registration order.
    pub fn categories(&self) -> Vec<String> {
        self.inner
            .read()
            .categories
            .iter()
            .filter(|(_, names)| !names.is_empty())
            .map(|(c, _)| c.clone())
            .collect()
    }

    /// Get the total number of registered operations.
    pub fn len(&self) -> usize {
        self.inner.read().operations.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cache statistics for both lookup caches.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            operations: self.by_name.stats(),
            categories: self.by_category.stats(),
        }
    }

    /// Operation names similar to `partial`, best first.
    ///
    /// Candidates are ranked by how they relate to `partial` (prefix, then
    /// substring, then in-order subsequence, then anything within a small
    /// edit distance), then by edit distance, then by registration order.
    /// Matching ignores case.
    pub fn suggest(&self, partial: &str, limit: usize) -> Vec<String> {
        let needle = partial.trim().to_lowercase();
        if needle.is_empty() || limit == 0 {
            return Vec::new();
        }
        let max_distance = (needle.chars().count() / 2).max(2);

        let inner = self.inner.read();
        let mut ranked: Vec<(u8, usize, usize, &String)> = inner
            .operations
            .keys()
            .enumerate()
            .filter_map(|(order, name)| {
                let candidate = name.to_lowercase();
                let distance = levenshtein(&needle, &candidate);
                let tier = if candidate.starts_with(&needle) {
                    0
                } else if candidate.contains(&needle) {
                    1
                } else if is_subsequence(&needle, &candidate) {
                    2
                } else if distance <= max_distance {
                    3
                } else {
                    return None;
                };
                Some((tier, distance, order, name))
            })
            .collect();

        ranked.sort();
        ranked
            .into_iter()
            .take(limit)
            .map(|(_, _, _, name)| name.clone())
            .collect()
    }

    /// Check a call's parameters against the operation's spec.
    ///
    /// Diagnostic paths are relative to the operation entry
    /// (`parameters.<name>`); callers re-base them onto the document.
    pub fn validate_call(&self, name: &str, parameters: &IndexMap<String, Value>) -> CallReport {
        let mut report = CallReport::default();

        let Some(spec) = self.get(name) else {
            let mut diagnostic = Diagnostic::error(
                category::OPERATION_PARAMETER,
                "unknown_operation",
                format!("Unknown operation \"{}\"", name),
            )
            .with_path("type")
            .with_extra("operation", name);
            let similar = self.suggest(name, 3);
            if !similar.is_empty() {
                diagnostic = diagnostic.with_suggestion(format!("Did you mean one of: {}?", similar.join(", ")));
            }
            report.errors.push(diagnostic);
            return report;
        };

        for given in parameters.keys() {
            if spec.parameter(given).is_none() {
                let mut diagnostic = Diagnostic::warning(
                    category::OPERATION_PARAMETER,
                    "unknown_parameter",
                    format!("Unknown parameter \"{}\" for operation \"{}\"", given, spec.name),
                )
                .with_path(format!("parameters.{}", given))
                .with_extra("operation", spec.name.as_str())
                .with_extra("parameter", given.as_str());
                if let Some(close) = closest_match(given, spec.parameters.keys().map(String::as_str), 0.5) {
                    diagnostic = diagnostic.with_suggestion(format!("Did you mean \"{}\"?", close));
                }
                report.warnings.push(diagnostic);
            }
        }

        for param in spec.parameters.values() {
            match parameters.get(&param.name).filter(|v| !v.is_null()) {
                None => fill_absent(&spec, param, &mut report),
                Some(value) => {
                    let problems = param.check_value(value);
                    if problems.is_empty() {
                        report.filled.insert(param.name.clone(), value.clone());
                    } else {
                        report.errors.extend(
                            problems
                                .into_iter()
                                .map(|d| d.with_extra("operation", spec.name.as_str())),
                        );
                    }
                }
            }
        }

        for check in &spec.checks {
            if let Err(violation) = (check.check)(parameters) {
                report.errors.push(
                    Diagnostic::error(
                        category::OPERATION_PARAMETER,
                        violation.code,
                        format!("{}: {}", spec.name, violation.message),
                    )
                    .with_path("parameters")
                    .with_extra("operation", spec.name.as_str())
                    .with_extra("check", check.name.as_str()),
                );
            }
        }

        report
    }

    /// Human-readable help for one operation.
    pub fn help(&self, name: &str) -> Option<String> {
        let spec = self.get(name)?;
        let mut out = String::new();
        let _ = writeln!(out, "{} ({})", spec.name, spec.category);
        if !spec.description.is_empty() {
            let _ = writeln!(out, "  {}", spec.description);
        }
        if !spec.parameters.is_empty() {
            let _ = writeln!(out, "Parameters:");
            for param in spec.parameters.values() {
                let _ = write!(
                    out,
                    "  {}: {}, {}",
                    param.name,
                    param.param_type,
                    if param.required { "required" } else { "optional" }
                );
                if let Some(default) = &param.default {
                    let _ = write!(out, ", default {}", default.display_scalar());
                }
                if let Some(allowed) = &param.allowed_values {
                    let listed: Vec<String> = allowed.iter().map(Value::display_scalar).collect();
                    let _ = write!(out, ", one of [{}]", listed.join(", "));
                }
                if !param.description.is_empty() {
                    let _ = write!(out, " - {}", param.description);
                }
                out.push('\n');
            }
        }
        if !spec.examples.is_empty() {
            let _ = writeln!(out, "Examples:");
            for example in &spec.examples {
                let _ = writeln!(out, "  {}", example);
            }
        }
        Some(out)
    }
}

fn fill_absent(spec: &OperationSpec, param: &ParameterSpec, report: &mut CallReport) {
    if param.required {
        report.errors.push(
            Diagnostic::error(
                category::OPERATION_PARAMETER,
                "missing_required_parameter",
                format!(
                    "Operation \"{}\" requires parameter \"{}\" ({})",
                    spec.name, param.name, param.param_type
                ),
            )
            .with_path(format!("parameters.{}", param.name))
            .with_suggestion(format!("Add \"{}\" to the operation's parameters", param.name))
            .with_extra("operation", spec.name.as_str())
            .with_extra("parameter", param.name.as_str()),
        );
    } else if let Some(default) = &param.default {
        report.filled.insert(param.name.clone(), default.clone());
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Builder for creating a customized registry.
pub struct RegistryBuilder {
    cache: CacheConfig,
    include_builtins: bool,
    extra: Vec<OperationSpec>,
}

impl RegistryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            cache: CacheConfig::default(),
            include_builtins: true,
            extra: Vec::new(),
        }
    }

    /// Include or exclude built-in operations.
    pub fn with_builtins(mut self, include: bool) -> Self {
        self.include_builtins = include;
        self
    }

    /// Set the lookup cache sizes.
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Register a custom operation. Custom operations override built-ins.
    pub fn register(mut self, spec: OperationSpec) -> Self {
        self.extra.push(spec);
        self
    }

    /// Build the registry.
    pub fn build(self) -> OperationRegistry {
        let registry = OperationRegistry::with_cache_config(&self.cache);
        if self.include_builtins {
            crate::operations::builtin::register_all(&registry);
        }
        for spec in self.extra {
            registry.register(spec);
        }
        registry
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
