//! Operation and parameter specifications.
//!
//! An `OperationSpec` describes one named transformation step a mapping may
//! use (`round`, `replace`, ...): its category, its typed parameters and any
//! checks that need to see the whole parameter map at once.

use crate::core::result::{category, Diagnostic};
use crate::core::types::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Accepted shape of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    String,
    Integer,
    /// Integers are accepted where floats are expected
    Float,
    Boolean,
    List,
    Dict,
    StringOrNumber,
    /// A number or the name of a column holding one
    ColumnReference,
    /// Free SQL-like text, subject to expression security checks
    SqlExpression,
    /// A scalar restricted by the parameter's allowed values
    Choice,
}

impl ParameterType {
    /// Check if a value has an acceptable shape for this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ParameterType::String, Value::String(_)) => true,
            (ParameterType::Integer, Value::Integer(_)) => true,
            (ParameterType::Float, Value::Integer(_) | Value::Float(_)) => true,
            (ParameterType::Boolean, Value::Bool(_)) => true,
            (ParameterType::List, Value::Sequence(_)) => true,
            (ParameterType::Dict, Value::Mapping(_)) => true,
            (
                ParameterType::StringOrNumber | ParameterType::ColumnReference,
                Value::String(_) | Value::Integer(_) | Value::Float(_),
            ) => true,
            (ParameterType::SqlExpression, Value::String(_)) => true,
            (
                ParameterType::Choice,
                Value::String(_) | Value::Integer(_) | Value::Float(_) | Value::Bool(_),
            ) => true,
            _ => false,
        }
    }

    /// Name used in diagnostics and help output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Integer => "integer",
            ParameterType::Float => "float",
            ParameterType::Boolean => "boolean",
            ParameterType::List => "list",
            ParameterType::Dict => "dict",
            ParameterType::StringOrNumber => "string_or_number",
            ParameterType::ColumnReference => "column_reference",
            ParameterType::SqlExpression => "sql_expression",
            ParameterType::Choice => "choice",
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constraints that can be applied to parameter values.
///
/// Numeric constraints ignore non-numeric values, so a column name passed
/// where a number is also allowed is never range-checked.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Constraint {
    /// Numeric value must be within range [min, max]
    Range { min: f64, max: f64 },
    /// Numeric value must be >= min
    MinValue(f64),
    /// Numeric value must be <= max
    MaxValue(f64),
    /// Numeric value must not be zero
    NonZero,
    /// String, list or dict must not be empty
    NotEmpty,

    /// Custom constraint with validation function
    /// Note: The closure is skipped during serialization
    #[serde(skip)]
    Custom {
        name: String,
        description: String,
        validator: Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>,
    },
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Range { min, max } => f
                .debug_struct("Range")
                .field("min", min)
                .field("max", max)
                .finish(),
            Constraint::MinValue(v) => f.debug_tuple("MinValue").field(v).finish(),
            Constraint::MaxValue(v) => f.debug_tuple("MaxValue").field(v).finish(),
            Constraint::NonZero => write!(f, "NonZero"),
            Constraint::NotEmpty => write!(f, "NotEmpty"),
            Constraint::Custom { name, description, .. } => f
                .debug_struct("Custom")
                .field("name", name)
                .field("description", description)
                .field("validator", &"<closure>")
                .finish(),
        }
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constraint::Range { min: a, max: b }, Constraint::Range { min: c, max: d }) => {
                a == c && b == d
            }
            (Constraint::MinValue(a), Constraint::MinValue(b)) => a == b,
            (Constraint::MaxValue(a), Constraint::MaxValue(b)) => a == b,
            (Constraint::NonZero, Constraint::NonZero) => true,
            (Constraint::NotEmpty, Constraint::NotEmpty) => true,
            (Constraint::Custom { name: a, .. }, Constraint::Custom { name: b, .. }) => a == b,
            _ => false,
        }
    }
}

/// A failed constraint: a machine-readable code plus a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Finding code, e.g. `parameter_below_minimum`.
    pub code: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl Violation {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

// ============================================================================
// Constraint Validation
// ============================================================================

impl Constraint {
    /// Validate a value against this constraint.
    pub fn check(&self, value: &Value) -> Result<(), Violation> {
        match self {
            Constraint::Range { min, max } => {
                if let Some(num) = value.as_f64() {
                    if num < *min {
                        return Err(Violation::new(
                            "parameter_below_minimum",
                            format!("must be >= {}, got {}", min, num),
                        ));
                    }
                    if num > *max {
                        return Err(Violation::new(
                            "parameter_above_maximum",
                            format!("must be <= {}, got {}", max, num),
                        ));
                    }
                }
            }

            Constraint::MinValue(min) => {
                if let Some(num) = value.as_f64() {
                    if num < *min {
                        return Err(Violation::new(
                            "parameter_below_minimum",
                            format!("must be >= {}, got {}", min, num),
                        ));
                    }
                }
            }

            Constraint::MaxValue(max) => {
                if let Some(num) = value.as_f64() {
                    if num > *max {
                        return Err(Violation::new(
                            "parameter_above_maximum",
                            format!("must be <= {}, got {}", max, num),
                        ));
                    }
                }
            }

            Constraint::NonZero => {
                if value.as_f64() == Some(0.0) {
                    return Err(Violation::new("zero_not_allowed", "must not be zero"));
                }
            }

            Constraint::NotEmpty => {
                let is_empty = match value {
                    Value::String(s) => s.trim().is_empty(),
                    Value::Sequence(items) => items.is_empty(),
                    Value::Mapping(map) => map.is_empty(),
                    _ => false,
                };
                if is_empty {
                    return Err(Violation::new("empty_parameter", "cannot be empty"));
                }
            }

            Constraint::Custom { validator, .. } => {
                validator(value).map_err(|msg| Violation::new("parameter_validation_error", msg))?;
            }
        }

        Ok(())
    }
}

// ============================================================================
// ParameterSpec
// ============================================================================

/// Specification of one operation parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name as written in the config.
    pub name: String,
    /// Accepted value shape.
    pub param_type: ParameterType,
    /// Whether the parameter must be given.
    pub required: bool,
    /// The only values accepted, when present.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub allowed_values: Option<Vec<Value>>,
    /// Value substituted when an optional parameter is absent.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub default: Option<Value>,
    /// Description for help output.
    pub description: String,
    /// Extra checks applied after the type check.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub constraints: Vec<Constraint>,
}

impl ParameterSpec {
    /// Create a required parameter.
    pub fn required(name: impl Into<String>, param_type: ParameterType) -> Self {
        Self::new(name, param_type, true)
    }

    /// Create an optional parameter.
    pub fn optional(name: impl Into<String>, param_type: ParameterType) -> Self {
        Self::new(name, param_type, false)
    }

    fn new(name: impl Into<String>, param_type: ParameterType, required: bool) -> Self {
        Self {
            name: name.into(),
            param_type,
            required,
            allowed_values: None,
            default: None,
            description: String::new(),
            constraints: Vec::new(),
        }
    }

    /// Set the default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Restrict the parameter to a set of values.
    pub fn with_allowed<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Add a range constraint.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.constraints.push(Constraint::Range { min, max });
        self
    }

    /// Add a minimum value constraint.
    pub fn with_min(mut self, min: f64) -> Self {
        self.constraints.push(Constraint::MinValue(min));
        self
    }

    /// Add a constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Check a given value: type first, then allowed values, then constraints.
    ///
    /// Paths on the returned diagnostics are relative to the operation entry.
    pub fn check_value(&self, value: &Value) -> Vec<Diagnostic> {
        let path = format!("parameters.{}", self.name);

        if !self.param_type.accepts(value) {
            return vec![Diagnostic::error(
                category::OPERATION_PARAMETER,
                "invalid_parameter_type",
                format!(
                    "{}: expected {}, got {}",
                    self.name,
                    self.param_type,
                    value.type_name()
                ),
            )
            .with_path(path)
            .with_extra("parameter", self.name.as_str())
            .with_extra("expected_type", self.param_type.as_str())
            .with_extra("actual_type", value.type_name())];
        }

        let mut diagnostics = Vec::new();

        if let Some(allowed) = &self.allowed_values {
            if !allowed.iter().any(|a| a.loose_eq(value)) {
                let listed: Vec<String> = allowed.iter().map(Value::display_scalar).collect();
                diagnostics.push(
                    Diagnostic::error(
                        category::OPERATION_PARAMETER,
                        "invalid_parameter_choice",
                        format!(
                            "{}: must be one of [{}], got {}",
                            self.name,
                            listed.join(", "),
                            value.display_scalar()
                        ),
                    )
                    .with_path(path.clone())
                    .with_suggestion(format!("Use one of: {}", listed.join(", ")))
                    .with_extra("parameter", self.name.as_str())
                    .with_extra("allowed_values", Value::Sequence(allowed.clone())),
                );
            }
        }

        for constraint in &self.constraints {
            if let Err(violation) = constraint.check(value) {
                diagnostics.push(
                    Diagnostic::error(
                        category::OPERATION_PARAMETER,
                        violation.code,
                        format!("{}: {}", self.name, violation.message),
                    )
                    .with_path(path.clone())
                    .with_extra("parameter", self.name.as_str())
                    .with_extra("actual_value", value.clone()),
                );
            }
        }

        diagnostics
    }
}

// ============================================================================
// OperationSpec
// ============================================================================

/// Check over the whole parameter map of a call.
pub type CallCheckFn = Arc<dyn Fn(&IndexMap<String, Value>) -> Result<(), Violation> + Send + Sync>;

/// A named call-level check.
#[derive(Clone)]
pub struct CallCheck {
    /// Name shown in help output.
    pub name: String,
    /// The check itself.
    pub check: CallCheckFn,
}

impl fmt::Debug for CallCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallCheck")
            .field("name", &self.name)
            .field("check", &"<closure>")
            .finish()
    }
}

impl PartialEq for CallCheck {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Specification of a transformation operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSpec {
    /// Unique name (e.g., "round").
    pub name: String,
    /// Category used for grouping (e.g., "numeric").
    pub category: String,
    /// Detailed description.
    pub description: String,
    /// Parameters in declaration order.
    pub parameters: IndexMap<String, ParameterSpec>,
    /// Example usages for help output.
    #[serde(default)]
    pub examples: Vec<String>,
    /// Checks run over the whole parameter map.
    #[serde(skip)]
    pub checks: Vec<CallCheck>,
}

impl OperationSpec {
    /// Create a new spec builder.
    pub fn builder(name: impl Into<String>, category: impl Into<String>) -> OperationSpecBuilder {
        OperationSpecBuilder::new(name, category)
    }

    /// Find a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.get(name)
    }

    /// Parameters that must be given.
    pub fn required_parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.values().filter(|p| p.required)
    }
}

/// Builder for OperationSpec.
pub struct OperationSpecBuilder {
    spec: OperationSpec,
}

impl OperationSpecBuilder {
    /// Create a new builder with required fields.
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            spec: OperationSpec {
                name: name.into(),
                category: category.into(),
                description: String::new(),
                parameters: IndexMap::new(),
                examples: Vec::new(),
                checks: Vec::new(),
            },
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = description.into();
        self
    }

    /// Add a parameter.
    pub fn parameter(mut self, param: ParameterSpec) -> Self {
        self.spec.parameters.insert(param.name.clone(), param);
        self
    }

    /// Add an example.
    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.spec.examples.push(example.into());
        self
    }

    /// Add a call-level check.
    pub fn check<F>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&IndexMap<String, Value>) -> Result<(), Violation> + Send + Sync + 'static,
    {
        self.spec.checks.push(CallCheck {
            name: name.into(),
            check: Arc::new(check),
        });
        self
    }

    /// Build the spec.
    pub fn build(self) -> OperationSpec {
        self.spec
    }
}

/// Helper for call checks that need to build a violation.
pub fn violation(code: &'static str, message: impl Into<String>) -> Violation {
    Violation::new(code, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_acceptance() {
        assert!(ParameterType::Float.accepts(&Value::Integer(3)));
        assert!(!ParameterType::Integer.accepts(&Value::Float(3.0)));
        assert!(ParameterType::ColumnReference.accepts(&Value::from("amount")));
        assert!(ParameterType::ColumnReference.accepts(&Value::Float(1.5)));
        assert!(!ParameterType::ColumnReference.accepts(&Value::Bool(true)));
        assert!(!ParameterType::Choice.accepts(&Value::Sequence(vec![])));
    }

    #[test]
    fn test_constraint_range() {
        let c = Constraint::Range { min: 0.0, max: 15.0 };
        assert!(c.check(&Value::Integer(4)).is_ok());
        assert_eq!(c.check(&Value::Integer(16)).unwrap_err().code, "parameter_above_maximum");
        assert_eq!(c.check(&Value::Integer(-1)).unwrap_err().code, "parameter_below_minimum");
        assert!(c.check(&Value::from("column_name")).is_ok());
    }

    #[test]
    fn test_non_zero_and_custom() {
        assert!(Constraint::NonZero.check(&Value::Float(0.0)).is_err());
        assert!(Constraint::NonZero.check(&Value::from("rate_col")).is_ok());

        let custom = Constraint::Custom {
            name: "even".to_string(),
            description: "must be even".to_string(),
            validator: Arc::new(|v| match v.as_i64() {
                Some(i) if i % 2 != 0 => Err("must be even".to_string()),
                _ => Ok(()),
            }),
        };
        assert_eq!(custom.check(&Value::Integer(3)).unwrap_err().code, "parameter_validation_error");
    }

    #[test]
    fn test_check_value_type_mismatch_names_both_types() {
        let spec = ParameterSpec::required("precision", ParameterType::Integer);
        let diags = spec.check_value(&Value::from("two"));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "invalid_parameter_type");
        assert!(diags[0].message.contains("integer"));
        assert!(diags[0].message.contains("string"));
        assert_eq!(diags[0].path, "parameters.precision");
    }

    #[test]
    fn test_check_value_allowed_values() {
        let spec = ParameterSpec::optional("mode", ParameterType::Choice).with_allowed(["UP", "DOWN"]);
        assert!(spec.check_value(&Value::from("UP")).is_empty());
        let diags = spec.check_value(&Value::from("SIDEWAYS"));
        assert_eq!(diags[0].code, "invalid_parameter_choice");
        assert!(diags[0].message.contains("UP, DOWN"));
    }

    #[test]
    fn test_builder_keeps_parameter_order() {
        let spec = OperationSpec::builder("replace", "string")
            .parameter(ParameterSpec::required("search", ParameterType::String))
            .parameter(ParameterSpec::required("replacement", ParameterType::String))
            .parameter(ParameterSpec::optional("case_sensitive", ParameterType::Boolean))
            .build();
        let names: Vec<_> = spec.parameters.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["search", "replacement", "case_sensitive"]);
        assert_eq!(spec.required_parameters().count(), 2);
    }
}
