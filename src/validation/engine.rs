//! The rule engine: a flat table of rule descriptors run in order.
//!
//! Rules are plain data (name, categories, severity, function). The engine
//! runs the rules whose categories intersect the requested set, in
//! registration order, and concatenates what they return. A rule that
//! returns an error or panics is isolated: it contributes exactly one
//! critical `rule_failure` diagnostic and the pass continues.

use crate::core::context::ValidationContext;
use crate::core::error::RuleResult;
use crate::core::result::{category, Diagnostic, Severity};
use indexmap::IndexSet;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Signature of a rule function.
pub type RuleFn = Arc<dyn Fn(&mut ValidationContext<'_>) -> RuleResult<Vec<Diagnostic>> + Send + Sync>;

/// A named rule with the categories that select it.
#[derive(Clone, Serialize)]
pub struct RuleDescriptor {
    /// Unique rule name.
    pub name: String,
    /// What the rule checks.
    pub description: String,
    /// Severity of the rule's typical finding.
    pub severity: Severity,
    /// Categories the rule belongs to.
    pub categories: IndexSet<String>,
    #[serde(skip)]
    function: RuleFn,
}

impl RuleDescriptor {
    /// Create a descriptor.
    pub fn new<F, C, S>(name: impl Into<String>, description: impl Into<String>, severity: Severity, categories: C, function: F) -> Self
    where
        F: Fn(&mut ValidationContext<'_>) -> RuleResult<Vec<Diagnostic>> + Send + Sync + 'static,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: description.into(),
            severity,
            categories: categories.into_iter().map(Into::into).collect(),
            function: Arc::new(function),
        }
    }

    /// Whether the rule runs for a category filter. `None` selects every rule.
    pub fn is_selected(&self, categories: Option<&[&str]>) -> bool {
        match categories {
            None => true,
            Some(wanted) => wanted.iter().any(|c| self.categories.contains(*c)),
        }
    }

    /// Run the rule without isolation.
    pub fn call(&self, ctx: &mut ValidationContext<'_>) -> RuleResult<Vec<Diagnostic>> {
        (self.function)(ctx)
    }
}

impl fmt::Debug for RuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDescriptor")
            .field("name", &self.name)
            .field("severity", &self.severity)
            .field("categories", &self.categories)
            .finish_non_exhaustive()
    }
}

/// Runs registered rules against a validation context.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: Vec<RuleDescriptor>,
}

impl RuleEngine {
    /// Create an engine with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule. A rule with the same name is replaced in place.
    pub fn register_rule(&mut self, descriptor: RuleDescriptor) {
        match self.rules.iter_mut().find(|r| r.name == descriptor.name) {
            Some(existing) => *existing = descriptor,
            None => self.rules.push(descriptor),
        }
    }

    /// Registered rules in execution order.
    pub fn list_rules(&self) -> &[RuleDescriptor] {
        &self.rules
    }

    /// Look up a rule by name.
    pub fn rule(&self, name: &str) -> Option<&RuleDescriptor> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Get the number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run the selected rules in registration order.
    pub fn execute_rules(&self, ctx: &mut ValidationContext<'_>, categories: Option<&[&str]>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for rule in self.rules.iter().filter(|r| r.is_selected(categories)) {
            match catch_unwind(AssertUnwindSafe(|| rule.call(ctx))) {
                Ok(Ok(found)) => diagnostics.extend(found),
                Ok(Err(error)) => diagnostics.push(rule_failure(&rule.name, &error.to_string())),
                Err(payload) => diagnostics.push(rule_failure(&rule.name, &panic_message(payload.as_ref()))),
            }
        }

        diagnostics
    }
}

fn rule_failure(rule: &str, reason: &str) -> Diagnostic {
    Diagnostic::error(
        category::RULE_FAILURE,
        "rule_execution_error",
        format!("Validation rule \"{}\" failed: {}", rule, reason),
    )
    .with_severity(Severity::Critical)
    .with_suggestion("Report this failure; the rule's other checks were skipped")
    .with_extra("rule", rule)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "rule panicked".to_string()
    }
}
