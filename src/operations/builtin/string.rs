//! String manipulation operations.

use crate::operations::registry::OperationRegistry;
use crate::operations::spec::{Constraint, OperationSpec, ParameterSpec, ParameterType};

/// Register string operations.
pub fn register(registry: &OperationRegistry) {
    registry.register(
        OperationSpec::builder("trim", "string")
            .description("Remove leading and trailing whitespace")
            .example("{type: trim}")
            .build(),
    );

    registry.register(
        OperationSpec::builder("lowercase", "string")
            .description("Convert text to lower case")
            .example("{type: lowercase}")
            .build(),
    );

    registry.register(
        OperationSpec::builder("uppercase", "string")
            .description("Convert text to upper case")
            .example("{type: uppercase}")
            .build(),
    );

    registry.register(
        OperationSpec::builder("replace", "string")
            .description("Replace every occurrence of a substring")
            .parameter(
                ParameterSpec::required("search", ParameterType::String)
                    .with_constraint(Constraint::NotEmpty)
                    .with_description("Text to look for"),
            )
            .parameter(
                ParameterSpec::required("replacement", ParameterType::String)
                    .with_description("Text to put in its place"),
            )
            .parameter(
                ParameterSpec::optional("case_sensitive", ParameterType::Boolean)
                    .with_default(true)
                    .with_description("Whether the search matches case exactly"),
            )
            .example("{type: replace, parameters: {search: '-', replacement: ''}}")
            .build(),
    );
}

#[cfg(test)]
mod tests {
    use crate::core::types::Value;
    use crate::operations::registry::OperationRegistry;
    use indexmap::IndexMap;

    #[test]
    fn test_replace_rejects_empty_search() {
        let registry = OperationRegistry::with_builtins();
        let mut params = IndexMap::new();
        params.insert("search".to_string(), Value::from("  "));
        params.insert("replacement".to_string(), Value::from("x"));
        let report = registry.validate_call("replace", &params);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].code, "empty_parameter");
    }

    #[test]
    fn test_replace_defaults_case_sensitive() {
        let registry = OperationRegistry::with_builtins();
        let mut params = IndexMap::new();
        params.insert("search".to_string(), Value::from("-"));
        params.insert("replacement".to_string(), Value::from(""));
        let report = registry.validate_call("replace", &params);
        assert!(report.is_valid());
        assert_eq!(report.filled.get("case_sensitive"), Some(&Value::Bool(true)));
    }
}
