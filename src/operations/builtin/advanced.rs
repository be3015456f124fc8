//! Free-form expression operations.

use crate::operations::registry::OperationRegistry;
use crate::operations::spec::{Constraint, OperationSpec, ParameterSpec, ParameterType};

/// Register expression operations.
pub fn register(registry: &OperationRegistry) {
    registry.register(
        OperationSpec::builder("sql_expression", "advanced")
            .description("Compute the value with a SQL expression")
            .parameter(
                ParameterSpec::required("expression", ParameterType::SqlExpression)
                    .with_constraint(Constraint::NotEmpty)
                    .with_description("Expression evaluated by the target engine"),
            )
            .parameter(
                ParameterSpec::optional("column_references", ParameterType::List)
                    .with_description("Columns the expression reads"),
            )
            .example("{type: sql_expression, parameters: {expression: 'amount * rate'}}")
            .build(),
    );
}
