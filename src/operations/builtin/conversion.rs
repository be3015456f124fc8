//! Type conversion operations.

use crate::operations::registry::OperationRegistry;
use crate::operations::spec::{OperationSpec, ParameterSpec, ParameterType};

/// Register conversion operations.
pub fn register(registry: &OperationRegistry) {
    registry.register(
        OperationSpec::builder("string_to_number", "conversion")
            .description("Convert text to a numeric type")
            .parameter(
                ParameterSpec::optional("number_type", ParameterType::Choice)
                    .with_default("decimal")
                    .with_allowed(["integer", "decimal", "float"]),
            )
            .parameter(ParameterSpec::optional("default_value", ParameterType::StringOrNumber).with_default(0_i64))
            .example("{type: string_to_number, parameters: {number_type: integer}}")
            .build(),
    );
}
