//! The orchestration layer: profiles over a shared rule engine.
//!
//! A `Validators` instance owns the rule engine, the services the built-in
//! rules use, a logger and the bounded job history. Each call builds its own
//! `ValidationContext`, so one instance can validate many documents from
//! several threads; only the history is shared mutable state.

use crate::core::config::ValidatorConfig;
use crate::core::context::ValidationContext;
use crate::core::logger::{LogFacade, ValidationLogger};
use crate::core::result::{ResultBuilder, ValidationResult};
use crate::core::types::{ConfigDocument, Value};
use crate::operations::registry::{OperationRegistry, RegistryBuilder};
use crate::validation::engine::{RuleDescriptor, RuleEngine};
use crate::validation::history::{HistoryEntry, ValidationHistory};
use crate::validation::profiles::Profile;
use crate::validation::report::ValidationReport;
use crate::validation::rules::{builtin_rules, RuleServices};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

const LOGGED_FINDINGS: usize = 3;

/// Validation outcome of one mapping.
#[derive(Debug, Clone, Serialize)]
pub struct MappingOutcome {
    /// Position in the document's `mappings` list.
    pub index: usize,
    /// The mapping's name, or a positional fallback.
    pub name: String,
    /// Result of validating the mapping on its own.
    pub result: ValidationResult,
}

/// Per-mapping outcomes of a document.
#[derive(Debug, Clone, Serialize)]
pub struct MappingOutcomes {
    /// One outcome per mapping, in document order.
    pub outcomes: Vec<MappingOutcome>,
    /// Whether every mapping is valid.
    pub all_valid: bool,
}

/// Builder for [`Validators`].
pub struct ValidatorsBuilder {
    config: ValidatorConfig,
    registry: Option<Arc<OperationRegistry>>,
    logger: Option<Arc<dyn ValidationLogger>>,
    rules: Vec<RuleDescriptor>,
}

impl ValidatorsBuilder {
    fn new() -> Self {
        Self {
            config: ValidatorConfig::default(),
            registry: None,
            logger: None,
            rules: Vec::new(),
        }
    }

    /// Use a configuration.
    pub fn config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing registry instead of building one with the built-ins.
    pub fn registry(mut self, registry: Arc<OperationRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Report progress through a logger. Defaults to the `log` facade.
    pub fn logger(mut self, logger: Arc<dyn ValidationLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Register an extra rule after the built-ins.
    pub fn rule(mut self, descriptor: RuleDescriptor) -> Self {
        self.rules.push(descriptor);
        self
    }

    /// Build the validators.
    pub fn build(self) -> Validators {
        let cache = self.config.cache.clone();
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(RegistryBuilder::new().cache(cache).build()));
        let history = ValidationHistory::new(self.config.history_capacity);
        let services = RuleServices::new(self.config, registry);

        let mut engine = RuleEngine::new();
        for descriptor in builtin_rules(&services).into_iter().chain(self.rules) {
            engine.register_rule(descriptor);
        }

        Validators {
            engine,
            services,
            logger: self.logger.unwrap_or_else(|| Arc::new(LogFacade)),
            history: Mutex::new(history),
        }
    }
}

/// Runs validation profiles over configuration documents.
pub struct Validators {
    engine: RuleEngine,
    services: RuleServices,
    logger: Arc<dyn ValidationLogger>,
    history: Mutex<ValidationHistory>,
}

impl Validators {
    /// Start building a validator set.
    pub fn builder() -> ValidatorsBuilder {
        ValidatorsBuilder::new()
    }

    /// Validators with the default configuration and built-in operations.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Run a profile. Job runs are recorded in the history.
    pub fn validate(&self, document: &ConfigDocument, profile: Profile) -> ValidationResult {
        let result = self.run(document, profile.categories(), profile.as_str());
        if profile.records_history() {
            self.record(profile, &result);
        }
        result
    }

    /// Run an explicit category selection.
    pub fn validate_categories(&self, document: &ConfigDocument, categories: &[&str]) -> ValidationResult {
        self.run(document, categories, "custom")
    }

    /// Validate one mapping on its own with the comprehensive profile.
    pub fn validate_mapping(&self, mapping: &Value) -> ValidationResult {
        let mut root = IndexMap::new();
        root.insert("mappings".to_string(), Value::Sequence(vec![mapping.clone()]));
        let document = ConfigDocument::from_mapping(root);
        self.run(&document, Profile::Comprehensive.categories(), Profile::Comprehensive.as_str())
    }

    /// Validate every mapping of a document separately.
    pub fn validate_all_mappings(&self, document: &ConfigDocument) -> MappingOutcomes {
        let outcomes: Vec<MappingOutcome> = ValidationContext::new(document)
            .mappings()
            .map(|view| MappingOutcome {
                index: view.index,
                name: view.name(),
                result: relocate(self.validate_mapping(view.node), view.index),
            })
            .collect();
        let all_valid = outcomes.iter().all(|o| o.result.is_valid());
        MappingOutcomes { outcomes, all_valid }
    }

    /// Run a profile and condense the result.
    pub fn report(&self, document: &ConfigDocument, profile: Profile) -> ValidationReport {
        let result = self.validate(document, profile);
        ValidationReport::from_result(&result, profile, self.history.lock().len())
    }

    /// Recorded job outcomes, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().entries().cloned().collect()
    }

    /// Forget recorded outcomes, returning how many were dropped.
    pub fn clear_history(&self) -> usize {
        let removed = self.history.lock().clear();
        self.logger.info(&format!("Cleared {} validation history entries", removed));
        removed
    }

    /// Registered rules in execution order.
    pub fn list_rules(&self) -> &[RuleDescriptor] {
        self.engine.list_rules()
    }

    /// Register another rule; a rule with the same name is replaced.
    pub fn register_rule(&mut self, descriptor: RuleDescriptor) {
        self.engine.register_rule(descriptor);
    }

    /// The operation registry the rules check calls against.
    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.services.registry
    }

    /// The active configuration.
    pub fn config(&self) -> &ValidatorConfig {
        &self.services.config
    }

    fn run(&self, document: &ConfigDocument, categories: &[&str], label: &str) -> ValidationResult {
        let mapping_count = document.mappings().len();
        self.logger.debug(&format!(
            "Running {} validation over {} mapping(s)",
            label, mapping_count
        ));

        let mut ctx = ValidationContext::new(document);
        let diagnostics = self.engine.execute_rules(&mut ctx, Some(categories));

        let mut builder = ResultBuilder::new();
        builder
            .extend(diagnostics)
            .set_metadata("profile", label)
            .set_metadata("categories", categories.to_vec())
            .set_metadata("mapping_count", mapping_count);
        let result = builder.build();

        self.log_outcome(label, &result);
        result
    }

    fn log_outcome(&self, label: &str, result: &ValidationResult) {
        if result.is_valid() {
            self.logger.info(&format!("{} validation: {}", label, result.summary()));
        } else {
            self.logger.error(&format!("{} validation: {}", label, result.summary()));
        }
        for error in result.errors.iter().take(LOGGED_FINDINGS) {
            self.logger.error(&error.to_string());
        }
        for warning in result.warnings.iter().take(LOGGED_FINDINGS) {
            self.logger.warning(&warning.to_string());
        }
    }

    fn record(&self, profile: Profile, result: &ValidationResult) {
        let evicted = self.history.lock().record(HistoryEntry::new(profile, result.clone()));
        if let Some(entry) = evicted {
            self.logger.debug(&format!("Evicted history entry {}", entry.id));
        }
    }
}

/// Point paths of a single-mapping result back at the mapping's real index.
fn relocate(mut result: ValidationResult, index: usize) -> ValidationResult {
    const WRAPPED: &str = "mappings[0]";
    let actual = format!("mappings[{}]", index);
    for diagnostic in result
        .errors
        .iter_mut()
        .chain(result.warnings.iter_mut())
        .chain(result.info.iter_mut())
    {
        if let Some(rest) = diagnostic.path.strip_prefix(WRAPPED) {
            diagnostic.path = format!("{}{}", actual, rest);
        }
    }
    result
}

impl Default for Validators {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RuleError;
    use crate::core::logger::{LogLevel, MemoryLogger};
    use crate::core::result::{category, Severity};
    use crate::validation::rules::fixtures::{doc, valid_job, VALID_JOB};

    const UNDEFINED_ALIAS: &str = r#"
mappings:
  - mapping_name: customers
    source_columns_interested: [id, name]
    column_transformations:
      - source_alias: desc
        target_column: description
        data_type: VARCHAR(200)
        transformation_type: direct_mapping
"#;

    fn quiet() -> Validators {
        Validators::builder().logger(Arc::new(MemoryLogger::new())).build()
    }

    #[test]
    fn test_valid_job_passes_every_profile() {
        let validators = quiet();
        let document = valid_job();
        for profile in Profile::ALL {
            let result = validators.validate(&document, profile);
            assert!(result.is_valid(), "{}: {:?}", profile, result.errors);
            assert!(result.errors.is_empty());
            assert!(result.warnings.is_empty(), "{}: {:?}", profile, result.warnings);
        }
    }

    #[test]
    fn test_missing_or_malformed_mappings_fail_every_profile() {
        let validators = quiet();
        for (yaml, code) in [
            ("settings:\n  load: full\n", "missing_required_field"),
            ("mappings: oops\n", "invalid_mappings_type"),
        ] {
            let document = doc(yaml);
            for profile in Profile::ALL {
                let result = validators.validate(&document, profile);
                assert!(!result.is_valid(), "{} accepted {:?}", profile, yaml);
                assert_eq!(result.errors[0].code, code, "{}", profile);
                assert_eq!(result.errors[0].path, "mappings");
            }
        }
    }

    #[test]
    fn test_undefined_alias_end_to_end() {
        let validators = quiet();
        let document = doc(UNDEFINED_ALIAS);
        for profile in [Profile::Comprehensive, Profile::SqlEnhanced] {
            let result = validators.validate(&document, profile);
            assert!(!result.is_valid());
            assert_eq!(result.errors.len(), 1);
            let error = &result.errors[0];
            assert_eq!(error.category, category::CROSS_REFERENCE);
            assert_eq!(
                error.extra.get("available_aliases"),
                Some(&Value::from(vec!["id", "name"]))
            );
            assert_eq!(result.by_category(category::SECURITY).count(), 0);
        }
    }

    #[test]
    fn test_structural_profile_skips_references() {
        let result = quiet().validate(&doc(UNDEFINED_ALIAS), Profile::Structural);
        assert!(result.is_valid());
    }

    #[test]
    fn test_validation_is_idempotent() {
        let validators = quiet();
        let document = doc(UNDEFINED_ALIAS);
        let first = validators.validate(&document, Profile::Job);
        let second = validators.validate(&document, Profile::Job);
        assert_eq!(first, second);
    }

    #[test]
    fn test_failing_extra_rule_is_isolated() {
        let validators = Validators::builder()
            .logger(Arc::new(MemoryLogger::new()))
            .rule(RuleDescriptor::new("broken", "always fails", Severity::Error, ["structure"], |_ctx| {
                Err(RuleError::failed("boom"))
            }))
            .build();
        let result = validators.validate(&valid_job(), Profile::Structural);
        assert!(!result.is_valid());
        assert_eq!(result.critical_errors().len(), 1);
        assert_eq!(result.errors[0].category, category::RULE_FAILURE);
    }

    #[test]
    fn test_history_only_for_job_and_bounded() {
        let config = ValidatorConfig {
            history_capacity: 2,
            ..ValidatorConfig::default()
        };
        let validators = Validators::builder()
            .config(config)
            .logger(Arc::new(MemoryLogger::new()))
            .build();
        let document = valid_job();

        validators.validate(&document, Profile::Comprehensive);
        assert!(validators.history().is_empty());

        for _ in 0..3 {
            validators.validate(&document, Profile::Job);
        }
        let history = validators.history();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|e| e.profile == Profile::Job && e.is_valid));
        assert_eq!(validators.clear_history(), 2);
        assert!(validators.history().is_empty());
    }

    #[test]
    fn test_validate_mapping_alone() {
        let validators = quiet();
        let document = doc(UNDEFINED_ALIAS);
        let result = validators.validate_mapping(&document.mappings()[0]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, "mappings[0].column_transformations[0].source_alias");
    }

    #[test]
    fn test_validate_all_mappings() {
        let validators = quiet();
        let outcomes = validators.validate_all_mappings(&valid_job());
        assert!(outcomes.all_valid);
        let names: Vec<_> = outcomes.outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["customers", "orders"]);

        let broken = format!("{}\n{}", VALID_JOB.trim_end(), "  - mapping_name: 'bad name'\n");
        let outcomes = validators.validate_all_mappings(&doc(&broken));
        assert!(!outcomes.all_valid);
        let third = &outcomes.outcomes[2].result;
        assert!(!third.is_valid());
        assert_eq!(third.errors[0].path, "mappings[2].mapping_name");
    }

    #[test]
    fn test_report_and_categories() {
        let validators = quiet();
        let document = doc(UNDEFINED_ALIAS);
        let report = validators.report(&document, Profile::Job);
        assert_eq!(report.status, "failed");
        assert_eq!(report.history_count, 1);
        assert_eq!(report.affected_mappings, vec!["customers"]);

        let result = validators.validate_categories(&document, &["quality"]);
        assert!(result.is_valid());
        assert_eq!(result.metadata.get("profile"), Some(&Value::from("custom")));
    }

    #[test]
    fn test_outcome_is_logged() {
        let logger = Arc::new(MemoryLogger::new());
        let validators = Validators::builder().logger(logger.clone()).build();
        validators.validate(&doc(UNDEFINED_ALIAS), Profile::Comprehensive);
        let errors = logger.at_level(LogLevel::Error);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("comprehensive validation: ✗"));
        assert_eq!(logger.at_level(LogLevel::Debug).len(), 1);
    }

    #[test]
    fn test_shared_registry_extension() {
        let registry = Arc::new(OperationRegistry::with_builtins());
        let validators = Validators::builder()
            .registry(Arc::clone(&registry))
            .logger(Arc::new(MemoryLogger::new()))
            .build();
        let document = doc(
            r#"
mappings:
  - mapping_name: m
    source_columns_interested: [code]
    column_transformations:
      - source_alias: code
        target_column: code_norm
        data_type: VARCHAR(10)
        transformation_type: string_manipulation
        transformations:
          - type: normalize_code
"#,
        );
        let before = validators.validate(&document, Profile::Structural);
        assert_eq!(before.errors[0].code, "unknown_operation");

        registry.register(crate::operations::spec::OperationSpec::builder("normalize_code", "string").build());
        assert!(validators.validate(&document, Profile::Structural).is_valid());
    }
}
