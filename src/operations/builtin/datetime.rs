//! Date and time operations.

use crate::operations::registry::OperationRegistry;
use crate::operations::spec::{Constraint, OperationSpec, ParameterSpec, ParameterType};

/// Register date operations.
pub fn register(registry: &OperationRegistry) {
    registry.register(
        OperationSpec::builder("format_date", "datetime")
            .description("Reformat a date or timestamp")
            .parameter(
                ParameterSpec::required("format_pattern", ParameterType::String)
                    .with_constraint(Constraint::NotEmpty)
                    .with_description("Output pattern, e.g. yyyy-MM-dd"),
            )
            .parameter(
                ParameterSpec::optional("input_format", ParameterType::String)
                    .with_description("Pattern of the incoming value when it is text"),
            )
            .example("{type: format_date, parameters: {format_pattern: 'yyyy-MM-dd'}}")
            .build(),
    );
}
