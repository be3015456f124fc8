//! Conditional operations.

use crate::operations::registry::OperationRegistry;
use crate::operations::spec::{Constraint, OperationSpec, ParameterSpec, ParameterType};

/// Register conditional operations.
pub fn register(registry: &OperationRegistry) {
    registry.register(
        OperationSpec::builder("case_when", "conditional")
            .description("Map values through an ordered list of conditions")
            .parameter(
                ParameterSpec::required("conditions", ParameterType::List)
                    .with_constraint(Constraint::NotEmpty)
                    .with_description("List of {when, then} entries"),
            )
            .parameter(
                ParameterSpec::optional("default_value", ParameterType::StringOrNumber)
                    .with_description("Value used when no condition matches"),
            )
            .example("{type: case_when, parameters: {conditions: [{when: \"status = 'A'\", then: 'Active'}]}}")
            .build(),
    );
}

#[cfg(test)]
mod tests {
    use crate::core::types::Value;
    use crate::operations::registry::OperationRegistry;
    use indexmap::IndexMap;

    #[test]
    fn test_case_when_needs_conditions() {
        let registry = OperationRegistry::with_builtins();
        let mut params = IndexMap::new();
        params.insert("conditions".to_string(), Value::Sequence(vec![]));
        let report = registry.validate_call("case_when", &params);
        assert_eq!(report.errors[0].code, "empty_parameter");

        params.insert("conditions".to_string(), Value::from("status = 'A'"));
        let report = registry.validate_call("case_when", &params);
        assert_eq!(report.errors[0].code, "invalid_parameter_type");
    }
}
